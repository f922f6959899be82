//! Destination object capability
//!
//! The destination bucket is abstracted behind [`ObjectStore`]: put an
//! object by key, get a small object by key. Both file uploads and the
//! watermark object go through this seam.

use crate::error::Result;
use async_trait::async_trait;

/// Metadata attached to uploaded objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectMeta {
    /// Source modification time, Unix epoch seconds
    pub source_mtime: Option<u64>,
}

impl ObjectMeta {
    /// Metadata for a file upload
    pub fn for_file(source_mtime: u64) -> Self {
        Self {
            source_mtime: Some(source_mtime),
        }
    }
}

/// Capability to read and write destination objects.
///
/// A put creates or overwrites exactly one object; single-object write
/// atomicity is the underlying store's contract, not re-implemented here.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create or overwrite one object
    async fn put_object(&self, key: &str, body: Vec<u8>, meta: &ObjectMeta) -> Result<()>;

    /// Read one object in full; `Ok(None)` when the key does not exist
    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>>;
}
