//! Watermark persistence
//!
//! The watermark is a single small object at a configured destination
//! key, holding the modification-time threshold below which files are
//! assumed already synced. Its content is the ASCII decimal Unix epoch
//! value; absence of the object means no prior successful sync.

use crate::error::{Result, SyncError};
use crate::storage::{ObjectMeta, ObjectStore};
use std::sync::Arc;

/// The modification-time threshold from the last successful run.
///
/// `timestamp == None` is the first-run state: every listed file is a
/// candidate for transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncMarker {
    /// Threshold as Unix epoch seconds
    pub timestamp: Option<u64>,
}

impl SyncMarker {
    /// The no-prior-sync state
    pub fn absent() -> Self {
        Self { timestamp: None }
    }

    /// A marker at a known threshold
    pub fn at(timestamp: u64) -> Self {
        Self {
            timestamp: Some(timestamp),
        }
    }

    /// True when no prior successful sync is recorded
    pub fn is_absent(&self) -> bool {
        self.timestamp.is_none()
    }
}

/// Parse marker object content.
fn parse_marker(content: &[u8]) -> std::result::Result<u64, String> {
    let text = std::str::from_utf8(content).map_err(|e| e.to_string())?;
    text.trim()
        .parse::<u64>()
        .map_err(|e| format!("not an epoch timestamp: {e}"))
}

/// Serialize a marker timestamp into object content.
fn format_marker(timestamp: u64) -> Vec<u8> {
    timestamp.to_string().into_bytes()
}

/// Reads and writes the watermark object at a fixed key.
pub struct MarkerStore<S: ObjectStore> {
    store: Arc<S>,
    key: String,
}

impl<S: ObjectStore> MarkerStore<S> {
    /// Create a store bound to the configured marker key
    pub fn new(store: Arc<S>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Read the marker. A missing object is the absent state, not an
    /// error; an unreadable or unparseable object is fatal.
    pub async fn read(&self) -> Result<SyncMarker> {
        let content = self.store.get_object(&self.key).await.map_err(|e| {
            SyncError::MarkerRead {
                key: self.key.clone(),
                message: e.to_string(),
            }
        })?;

        match content {
            None => {
                tracing::info!("No sync marker at '{}', treating every file as new", self.key);
                Ok(SyncMarker::absent())
            }
            Some(bytes) => {
                let timestamp =
                    parse_marker(&bytes).map_err(|message| SyncError::MarkerRead {
                        key: self.key.clone(),
                        message,
                    })?;
                tracing::info!("Using incremental sync with marker {timestamp}");
                Ok(SyncMarker::at(timestamp))
            }
        }
    }

    /// Persist a new threshold. Called only after every planned transfer
    /// succeeded.
    pub async fn write(&self, timestamp: u64) -> Result<()> {
        tracing::info!("Updating sync marker at '{}' to {timestamp}", self.key);
        self.store
            .put_object(&self.key, format_marker(timestamp), &ObjectMeta::default())
            .await
            .map_err(|e| SyncError::MarkerWrite {
                key: self.key.clone(),
                message: e.to_string(),
            })
    }
}
