//! Run orchestration
//!
//! Drives one sync run through its phases: list the source, read the
//! watermark, plan, transfer, and commit the new watermark. The commit
//! happens only after every planned transfer succeeded, so a crash or
//! partial failure leaves the watermark at its prior value and the next
//! run retries the same files.

use crate::error::Result;
use crate::source::FileSource;
use crate::storage::ObjectStore;
use crate::sync::{plan, MarkerStore, TransferExecutor, TransferOutcome};
use humansize::{format_size, BINARY};
use serde::Serialize;
use std::sync::Arc;

/// One failed entry in the run report
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedTransfer {
    /// Relative source path
    pub path: String,
    /// Why the transfer failed
    pub reason: String,
}

/// Result surface of one run, for the CLI layer to report and set the
/// process exit status from.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Files found in the source listing
    pub listed: usize,
    /// Files selected for transfer
    pub selected: usize,
    /// Files transferred successfully
    pub transferred: usize,
    /// Bytes transferred successfully
    pub bytes_transferred: u64,
    /// Entries that failed to transfer
    pub failed: Vec<FailedTransfer>,
    /// The committed watermark, when the run advanced it
    pub committed_marker: Option<u64>,
}

impl RunReport {
    /// True when no entry failed
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Print a human-readable summary
    pub fn print_summary(&self) {
        println!("\n=== Sync Summary ===");
        println!("Files listed:      {}", self.listed);
        println!("Files selected:    {}", self.selected);
        println!("Files transferred: {}", self.transferred);
        println!(
            "Bytes transferred: {}",
            format_size(self.bytes_transferred, BINARY)
        );
        match self.committed_marker {
            Some(ts) => println!("Marker committed:  {ts}"),
            None => println!("Marker committed:  unchanged"),
        }

        if !self.failed.is_empty() {
            println!("\nFailures:");
            for failure in &self.failed {
                println!("  {} - {}", failure.path, failure.reason);
            }
        }
    }
}

/// Options consumed by the coordinator; validated by the config layer.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Prefix prepended to every destination key
    pub key_prefix: String,
    /// Destination key of the watermark object
    pub marker_key: String,
    /// Bounded transfer concurrency
    pub concurrency: usize,
    /// Plan and report without transferring or committing
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            key_prefix: String::new(),
            marker_key: String::new(),
            concurrency: 4,
            dry_run: false,
        }
    }
}

/// Orchestrates one run over the source and destination capabilities.
pub struct SyncCoordinator<L, S> {
    source: Arc<L>,
    store: Arc<S>,
    options: SyncOptions,
}

impl<L, S> SyncCoordinator<L, S>
where
    L: FileSource + 'static,
    S: ObjectStore + 'static,
{
    /// Create a coordinator
    pub fn new(source: Arc<L>, store: Arc<S>, options: SyncOptions) -> Self {
        Self {
            source,
            store,
            options,
        }
    }

    /// Execute one run.
    ///
    /// Fatal errors (unreachable source, broken listing, unreadable or
    /// unwritable marker) return `Err`. Per-entry transfer failures
    /// return `Ok` with the failures aggregated in the report and the
    /// watermark untouched.
    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!("Listing all files at the source recursively...");
        let entries = self.source.list().await?;
        tracing::info!("Listing complete: {} files", entries.len());

        let markers = MarkerStore::new(Arc::clone(&self.store), &self.options.marker_key);
        let marker = markers.read().await?;
        let plan = plan(&entries, &marker);
        tracing::info!(
            "Plan: {} of {} files selected ({})",
            plan.entries.len(),
            entries.len(),
            format_size(plan.total_bytes(), BINARY)
        );

        if self.options.dry_run {
            for entry in &plan.entries {
                tracing::info!("Would upload {}", entry.path);
            }
            return Ok(RunReport {
                listed: entries.len(),
                selected: plan.entries.len(),
                transferred: 0,
                bytes_transferred: 0,
                failed: Vec::new(),
                committed_marker: None,
            });
        }

        let executor = TransferExecutor::new(
            Arc::clone(&self.source),
            Arc::clone(&self.store),
            self.options.key_prefix.clone(),
            self.options.concurrency,
        );
        let results = executor.transfer_all(&plan.entries).await;

        let mut transferred = 0;
        let mut bytes_transferred = 0;
        let mut failed = Vec::new();
        for result in &results {
            match &result.outcome {
                TransferOutcome::Success { bytes } => {
                    transferred += 1;
                    bytes_transferred += bytes;
                }
                TransferOutcome::Failure { reason } => failed.push(FailedTransfer {
                    path: result.entry.path.clone(),
                    reason: reason.clone(),
                }),
            }
        }

        if !failed.is_empty() {
            tracing::warn!(
                "{} of {} transfers failed; marker stays at its prior value",
                failed.len(),
                results.len()
            );
            return Ok(RunReport {
                listed: entries.len(),
                selected: plan.entries.len(),
                transferred,
                bytes_transferred,
                failed,
                committed_marker: None,
            });
        }

        // Monotonic guard: never move the watermark backward, never
        // rewrite an unchanged value.
        let committed_marker = match (marker.timestamp, plan.next_marker) {
            (Some(previous), Some(next)) if next > previous => {
                markers.write(next).await?;
                Some(next)
            }
            (None, Some(next)) => {
                markers.write(next).await?;
                Some(next)
            }
            _ => None,
        };

        tracing::info!(
            "Finished: {} files synced, {} total",
            transferred,
            format_size(bytes_transferred, BINARY)
        );

        Ok(RunReport {
            listed: entries.len(),
            selected: plan.entries.len(),
            transferred,
            bytes_transferred,
            failed,
            committed_marker,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::source::FileEntry;
    use crate::storage::memory::MemoryStore;
    use async_trait::async_trait;
    use std::collections::HashMap;

    const MARKER_KEY: &str = "state/last-sync";

    struct FakeSource {
        entries: Vec<FileEntry>,
        blobs: HashMap<String, Vec<u8>>,
        fail_list: bool,
    }

    impl FakeSource {
        /// Build a source where each file's content is its own path.
        fn with_files(files: &[(&str, u64)]) -> Self {
            Self {
                entries: files
                    .iter()
                    .map(|(path, mtime)| FileEntry::new(*path, path.len() as u64, *mtime))
                    .collect(),
                blobs: files
                    .iter()
                    .map(|(path, _)| (path.to_string(), path.as_bytes().to_vec()))
                    .collect(),
                fail_list: false,
            }
        }

        fn failing_listing() -> Self {
            Self {
                entries: Vec::new(),
                blobs: HashMap::new(),
                fail_list: true,
            }
        }
    }

    #[async_trait]
    impl FileSource for FakeSource {
        async fn list(&self) -> crate::error::Result<Vec<FileEntry>> {
            if self.fail_list {
                return Err(SyncError::listing("inbox", "permission denied"));
            }
            Ok(self.entries.clone())
        }

        async fn fetch(&self, path: &str) -> crate::error::Result<Vec<u8>> {
            self.blobs
                .get(path)
                .cloned()
                .ok_or_else(|| SyncError::transfer(path, "no such file"))
        }
    }

    fn coordinator(
        source: FakeSource,
        store: &Arc<MemoryStore>,
        dry_run: bool,
    ) -> SyncCoordinator<FakeSource, MemoryStore> {
        SyncCoordinator::new(
            Arc::new(source),
            Arc::clone(store),
            SyncOptions {
                marker_key: MARKER_KEY.to_string(),
                dry_run,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_first_run_then_idempotent_second_run() {
        let store = Arc::new(MemoryStore::new());
        let files = [("a.txt", 100), ("b.txt", 200)];

        let report = coordinator(FakeSource::with_files(&files), &store, false)
            .run()
            .await
            .unwrap();
        assert!(report.is_success());
        assert_eq!(report.transferred, 2);
        assert_eq!(report.committed_marker, Some(200));
        assert_eq!(store.object(MARKER_KEY).unwrap(), b"200");
        let puts_after_first = store.puts();

        // Unchanged source: nothing is selected, nothing is written.
        let report = coordinator(FakeSource::with_files(&files), &store, false)
            .run()
            .await
            .unwrap();
        assert!(report.is_success());
        assert_eq!(report.selected, 0);
        assert_eq!(report.transferred, 0);
        assert_eq!(report.committed_marker, None);
        assert_eq!(store.puts(), puts_after_first);
    }

    #[tokio::test]
    async fn test_failed_transfer_blocks_commit() {
        let store = Arc::new(MemoryStore::new());
        store.fail_puts_to("b.txt");

        let files = [("a.txt", 100), ("b.txt", 150), ("c.txt", 200)];
        let report = coordinator(FakeSource::with_files(&files), &store, false)
            .run()
            .await
            .unwrap();

        assert!(!report.is_success());
        assert_eq!(report.transferred, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, "b.txt");
        assert_eq!(report.committed_marker, None);
        // Exactly the two successful destination writes, no marker write.
        assert_eq!(store.puts(), 2);
        assert!(store.object(MARKER_KEY).is_none());
    }

    #[tokio::test]
    async fn test_marker_write_failure_is_fatal_but_transfers_stand() {
        let store = Arc::new(MemoryStore::new());
        store.fail_puts_to(MARKER_KEY);

        let files = [("a.txt", 100)];
        let err = coordinator(FakeSource::with_files(&files), &store, false)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::MarkerWrite { .. }));
        // The upload happened; the next run re-transfers it harmlessly.
        assert_eq!(store.object("a.txt").unwrap(), b"a.txt");
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_before_any_write() {
        let store = Arc::new(MemoryStore::new());
        let err = coordinator(FakeSource::failing_listing(), &store, false)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Listing { .. }));
        assert_eq!(store.puts(), 0);
    }

    #[tokio::test]
    async fn test_empty_source_leaves_marker_alone() {
        let store = Arc::new(MemoryStore::new());

        let report = coordinator(FakeSource::with_files(&[]), &store, false)
            .run()
            .await
            .unwrap();
        assert!(report.is_success());
        assert!(store.object(MARKER_KEY).is_none());

        store.seed(MARKER_KEY, b"300");
        let report = coordinator(FakeSource::with_files(&[]), &store, false)
            .run()
            .await
            .unwrap();
        assert_eq!(report.committed_marker, None);
        assert_eq!(store.object(MARKER_KEY).unwrap(), b"300");
    }

    #[tokio::test]
    async fn test_marker_never_moves_backward() {
        let store = Arc::new(MemoryStore::new());
        store.seed(MARKER_KEY, b"300");

        // Every listed file predates the watermark.
        let files = [("a.txt", 100), ("b.txt", 200)];
        let report = coordinator(FakeSource::with_files(&files), &store, false)
            .run()
            .await
            .unwrap();

        assert_eq!(report.selected, 0);
        assert_eq!(report.committed_marker, None);
        assert_eq!(store.object(MARKER_KEY).unwrap(), b"300");
    }

    #[tokio::test]
    async fn test_two_run_scenario_with_late_timestamp() {
        let store = Arc::new(MemoryStore::new());

        let report = coordinator(
            FakeSource::with_files(&[("a.txt", 100), ("b.txt", 200)]),
            &store,
            false,
        )
        .run()
        .await
        .unwrap();
        assert_eq!(report.transferred, 2);
        assert_eq!(report.committed_marker, Some(200));

        // a.txt modified to 250; c.txt arrives with a timestamp already
        // behind the watermark, so it is never selected.
        let report = coordinator(
            FakeSource::with_files(&[("a.txt", 250), ("b.txt", 200), ("c.txt", 150)]),
            &store,
            false,
        )
        .run()
        .await
        .unwrap();
        assert_eq!(report.selected, 1);
        assert_eq!(report.transferred, 1);
        assert_eq!(report.committed_marker, Some(250));
        assert_eq!(store.object(MARKER_KEY).unwrap(), b"250");
        assert!(store.object("c.txt").is_none());
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let files = [("a.txt", 100), ("b.txt", 200)];

        let report = coordinator(FakeSource::with_files(&files), &store, true)
            .run()
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.selected, 2);
        assert_eq!(report.transferred, 0);
        assert_eq!(report.committed_marker, None);
        assert_eq!(store.puts(), 0);
    }

    #[tokio::test]
    async fn test_key_prefix_applies_to_uploads_not_marker() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = SyncCoordinator::new(
            Arc::new(FakeSource::with_files(&[("docs/a.txt", 100)])),
            Arc::clone(&store),
            SyncOptions {
                key_prefix: "mirror/".to_string(),
                marker_key: MARKER_KEY.to_string(),
                ..Default::default()
            },
        );

        let report = coordinator.run().await.unwrap();
        assert!(report.is_success());
        assert_eq!(store.object("mirror/docs/a.txt").unwrap(), b"docs/a.txt");
        assert_eq!(store.object(MARKER_KEY).unwrap(), b"100");
    }
}
