//! Transfer execution
//!
//! Moves each planned entry's bytes from the source to the destination
//! under the configured key prefix, with bounded concurrency. One
//! destination object is created or overwritten per entry. Failures are
//! recorded per entry and never cancel sibling transfers; retry policy
//! lives below this layer, in the destination adapter.

use crate::error::{Result, SyncError};
use crate::source::{FileEntry, FileSource};
use crate::storage::{ObjectMeta, ObjectStore};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Per-entry transfer outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The destination object was written
    Success {
        /// Bytes transferred
        bytes: u64,
    },
    /// The entry could not be transferred; the run must not commit
    Failure {
        /// Why the transfer failed
        reason: String,
    },
}

/// One entry's result, collected by the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    /// The planned entry
    pub entry: FileEntry,
    /// What happened to it
    pub outcome: TransferOutcome,
}

impl TransferResult {
    /// True when the destination object was written
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TransferOutcome::Success { .. })
    }
}

/// Derive the destination object key for an entry path.
///
/// Leading slashes and `.` components are stripped, separators are
/// preserved, and the prefix is used verbatim (so `backups/` nests the
/// tree under a folder while `backups-` produces flat prefixed keys).
pub fn destination_key(prefix: &str, path: &str) -> String {
    let normalized: Vec<&str> = path
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    format!("{prefix}{}", normalized.join("/"))
}

/// Streams planned entries from source to destination.
pub struct TransferExecutor<L, S> {
    source: Arc<L>,
    store: Arc<S>,
    key_prefix: String,
    concurrency: usize,
}

impl<L, S> TransferExecutor<L, S>
where
    L: FileSource + 'static,
    S: ObjectStore + 'static,
{
    /// Create an executor over the two capabilities
    pub fn new(
        source: Arc<L>,
        store: Arc<S>,
        key_prefix: impl Into<String>,
        concurrency: usize,
    ) -> Self {
        Self {
            source,
            store,
            key_prefix: key_prefix.into(),
            concurrency: concurrency.max(1),
        }
    }

    /// Transfer every entry, returning one result per entry in input
    /// order. All outcomes are awaited; a failed transfer never cancels
    /// the ones already in flight.
    pub async fn transfer_all(&self, entries: &[FileEntry]) -> Vec<TransferResult> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(entries.len());

        for entry in entries {
            let entry = entry.clone();
            let source = Arc::clone(&self.source);
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let key = destination_key(&self.key_prefix, &entry.path);

            let task_entry = entry.clone();
            handles.push((
                entry,
                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|e| SyncError::transfer(&task_entry.path, e.to_string()))?;
                    transfer_one(&*source, &*store, &key, &task_entry).await
                }),
            ));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (entry, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(bytes)) => TransferOutcome::Success { bytes },
                Ok(Err(e)) => TransferOutcome::Failure {
                    reason: e.to_string(),
                },
                Err(e) => TransferOutcome::Failure {
                    reason: format!("transfer task failed: {e}"),
                },
            };
            results.push(TransferResult { entry, outcome });
        }
        results
    }
}

/// Move one entry; returns the byte count on success.
async fn transfer_one<L: FileSource, S: ObjectStore>(
    source: &L,
    store: &S,
    key: &str,
    entry: &FileEntry,
) -> Result<u64> {
    tracing::info!("Uploading {} -> {}", entry.path, key);

    let bytes = source.fetch(&entry.path).await?;
    let len = bytes.len() as u64;

    store
        .put_object(key, bytes, &ObjectMeta::for_file(entry.modified_at))
        .await
        .map_err(|e| SyncError::transfer(&entry.path, e.to_string()))?;

    Ok(len)
}
