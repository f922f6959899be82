//! Sync planning
//!
//! Pure selection logic: given one source listing and the current
//! watermark, decide which entries to transfer and what the next
//! watermark candidate is. Planning has no side effects and no
//! dependency on transfer order, so equal inputs always produce an
//! identical plan.

use crate::source::FileEntry;
use crate::sync::SyncMarker;

/// The outcome of planning one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    /// Entries selected for transfer, in listing order
    pub entries: Vec<FileEntry>,
    /// Candidate next watermark: the maximum `modified_at` across the
    /// whole listing, or the previous watermark for an empty listing
    pub next_marker: Option<u64>,
}

impl SyncPlan {
    /// True when nothing needs transferring
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes across selected entries
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

/// Compute the transfer plan for one run.
///
/// An entry is selected iff the watermark is absent or `modified_at` is
/// strictly greater than it; a file whose timestamp equals the watermark
/// was covered by the previous run. The candidate next watermark is
/// computed over ALL listed entries, selected or not, so it cannot get
/// stuck behind an already-synced newer file regardless of selection.
pub fn plan(entries: &[FileEntry], marker: &SyncMarker) -> SyncPlan {
    let selected = entries
        .iter()
        .filter(|entry| match marker.timestamp {
            None => true,
            Some(threshold) => entry.modified_at > threshold,
        })
        .cloned()
        .collect();

    let next_marker = entries
        .iter()
        .map(|entry| entry.modified_at)
        .max()
        .or(marker.timestamp);

    SyncPlan {
        entries: selected,
        next_marker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(path: &str, modified_at: u64) -> FileEntry {
        FileEntry::new(path, 10, modified_at)
    }

    #[test]
    fn test_absent_marker_selects_everything() {
        let entries = vec![entry("a.txt", 100), entry("b.txt", 200)];
        let plan = plan(&entries, &SyncMarker::absent());

        assert_eq!(plan.entries, entries);
        assert_eq!(plan.next_marker, Some(200));
    }

    #[test]
    fn test_selection_is_strictly_greater() {
        let entries = vec![
            entry("equal.txt", 200),
            entry("newer.txt", 201),
            entry("older.txt", 199),
        ];
        let plan = plan(&entries, &SyncMarker::at(200));

        assert_eq!(plan.entries, vec![entry("newer.txt", 201)]);
    }

    #[test]
    fn test_candidate_covers_unselected_entries() {
        // The already-synced file carries the newest timestamp; the
        // candidate must reflect it even though only the older file is
        // selected.
        let entries = vec![entry("synced.txt", 500), entry("late.txt", 350)];
        let plan = plan(&entries, &SyncMarker::at(300));

        assert_eq!(plan.entries, vec![entry("late.txt", 350)]);
        assert_eq!(plan.next_marker, Some(500));
    }

    #[test]
    fn test_empty_listing_keeps_previous_marker() {
        let plan_with_marker = plan(&[], &SyncMarker::at(400));
        assert!(plan_with_marker.is_empty());
        assert_eq!(plan_with_marker.next_marker, Some(400));

        let plan_first_run = plan(&[], &SyncMarker::absent());
        assert!(plan_first_run.is_empty());
        assert_eq!(plan_first_run.next_marker, None);
    }

    #[test]
    fn test_all_entries_at_or_below_marker() {
        let entries = vec![entry("a.txt", 100), entry("b.txt", 200)];
        let plan = plan(&entries, &SyncMarker::at(200));

        assert!(plan.is_empty());
        // Candidate may sit at or below the current marker; committing it
        // is the coordinator's monotonic guard, not the planner's.
        assert_eq!(plan.next_marker, Some(200));
    }

    #[test]
    fn test_listing_order_is_preserved() {
        let entries = vec![
            entry("z.txt", 300),
            entry("a.txt", 500),
            entry("m.txt", 400),
        ];
        let plan = plan(&entries, &SyncMarker::at(100));

        let paths: Vec<&str> = plan.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["z.txt", "a.txt", "m.txt"]);
    }

    #[test]
    fn test_two_run_scenario() {
        // Run 1: no marker, two files.
        let first = vec![entry("a.txt", 100), entry("b.txt", 200)];
        let plan1 = plan(&first, &SyncMarker::absent());
        assert_eq!(plan1.entries.len(), 2);
        assert_eq!(plan1.next_marker, Some(200));

        // Run 2: a.txt modified, c.txt added with a timestamp behind the
        // watermark. c.txt is skipped (known limitation of a pure
        // timestamp watermark), a.txt is re-sent.
        let second = vec![
            entry("a.txt", 250),
            entry("b.txt", 200),
            entry("c.txt", 150),
        ];
        let plan2 = plan(&second, &SyncMarker::at(200));
        assert_eq!(plan2.entries, vec![entry("a.txt", 250)]);
        assert_eq!(plan2.next_marker, Some(250));
    }

    proptest! {
        #[test]
        fn prop_plan_is_deterministic(
            mtimes in proptest::collection::vec(0u64..10_000, 0..40),
            threshold in proptest::option::of(0u64..10_000),
        ) {
            let entries: Vec<FileEntry> = mtimes
                .iter()
                .enumerate()
                .map(|(i, &m)| FileEntry::new(format!("f{i}"), i as u64, m))
                .collect();
            let marker = SyncMarker { timestamp: threshold };

            prop_assert_eq!(plan(&entries, &marker), plan(&entries, &marker));
        }

        #[test]
        fn prop_selected_are_strictly_newer(
            mtimes in proptest::collection::vec(0u64..10_000, 0..40),
            threshold in 0u64..10_000,
        ) {
            let entries: Vec<FileEntry> = mtimes
                .iter()
                .enumerate()
                .map(|(i, &m)| FileEntry::new(format!("f{i}"), i as u64, m))
                .collect();

            let plan = plan(&entries, &SyncMarker::at(threshold));
            prop_assert!(plan.entries.iter().all(|e| e.modified_at > threshold));
        }

        #[test]
        fn prop_candidate_dominates_listing(
            mtimes in proptest::collection::vec(0u64..10_000, 1..40),
            threshold in proptest::option::of(0u64..10_000),
        ) {
            let entries: Vec<FileEntry> = mtimes
                .iter()
                .enumerate()
                .map(|(i, &m)| FileEntry::new(format!("f{i}"), i as u64, m))
                .collect();
            let marker = SyncMarker { timestamp: threshold };

            let candidate = plan(&entries, &marker).next_marker.unwrap();
            prop_assert!(entries.iter().all(|e| e.modified_at <= candidate));
        }
    }
}
