//! Source listing capability
//!
//! The remote source is abstracted behind the [`FileSource`] trait:
//! list every regular file under the configured root, and fetch the
//! bytes of one file by its relative path. The sync engine never talks
//! to SFTP directly, which keeps it testable against in-memory sources.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata for a single file found during the source listing.
///
/// `path` is relative to the source root and slash-separated; it is
/// unique within one listing. Directories are not represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the source root, slash-separated
    pub path: String,
    /// File size in bytes
    pub size: u64,
    /// Modification time as Unix epoch seconds
    pub modified_at: u64,
}

impl FileEntry {
    /// Create an entry
    pub fn new(path: impl Into<String>, size: u64, modified_at: u64) -> Self {
        Self {
            path: path.into(),
            size,
            modified_at,
        }
    }
}

/// Capability to list and read files from the remote source.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// List every regular file under the source root.
    ///
    /// The listing is a single sequential traversal; a directory that
    /// cannot be read mid-walk fails the whole listing rather than
    /// returning a partial one.
    async fn list(&self) -> Result<Vec<FileEntry>>;

    /// Fetch the full contents of one file by its relative path.
    async fn fetch(&self, path: &str) -> Result<Vec<u8>>;
}
