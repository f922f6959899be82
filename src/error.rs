//! Error types for sftp2s3
//!
//! All failures are modeled as a closed set of tagged variants so callers
//! can branch on kind: fatal errors abort the run, per-entry transfer
//! errors are aggregated into the run report.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sync operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// Source endpoint unreachable
    #[error("Connection error to '{host}': {message}")]
    Connection { host: String, message: String },

    /// SSH authentication failed
    #[error("Authentication failed for '{user}@{host}': {message}")]
    Authentication {
        user: String,
        host: String,
        message: String,
    },

    /// A directory could not be read mid-walk; the listing is discarded
    #[error("Listing error at '{path}': {message}")]
    Listing { path: String, message: String },

    /// Per-entry transfer failure (read at source or write at destination)
    #[error("Transfer of '{path}' failed: {message}")]
    Transfer { path: String, message: String },

    /// Object storage operation failed
    #[error("Object store error for key '{key}': {message}")]
    Storage { key: String, message: String },

    /// Marker object exists but could not be read or parsed
    #[error("Marker at '{key}' could not be read: {message}")]
    MarkerRead { key: String, message: String },

    /// Marker object could not be written after a successful transfer batch
    #[error("Marker write to '{key}' failed: {message}")]
    MarkerWrite { key: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error with path context
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Create a connection error
    pub fn connection(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(
        user: impl Into<String>,
        host: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Authentication {
            user: user.into(),
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create a listing error
    pub fn listing(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Listing {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a per-entry transfer error
    pub fn transfer(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transfer {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an object store error
    pub fn storage(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check whether this error aborts the whole run.
    ///
    /// `Transfer` is the only non-fatal kind: it is recorded per entry and
    /// surfaces once in the aggregated report.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Transfer { .. })
    }
}

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
