//! # sftp2s3 - Incremental SFTP to S3 Sync
//!
//! sftp2s3 synchronizes a directory tree on an SFTP server to an S3
//! bucket, transferring only files that are new or modified since the
//! last successful run. The watermark of the last run is persisted as a
//! small object in the destination bucket and advances only after every
//! planned transfer succeeded.
//!
//! ## Features
//!
//! - **Incremental Sync**: strict greater-than selection against a
//!   persisted modification-time watermark
//! - **Safe Commits**: the watermark is written as the single final step
//!   of a fully successful run; partial failure leaves it untouched
//! - **Bounded Concurrency**: transfers overlap network latency on a
//!   pooled set of SFTP connections
//! - **S3-Compatible Destinations**: custom endpoints, path-style
//!   access, static credentials or the ambient AWS credential chain
//!
//! ## Quick Start
//!
//! ```no_run
//! use sftp2s3::source::SftpSource;
//! use sftp2s3::storage::{S3Config, S3Store};
//! use sftp2s3::sync::{SyncCoordinator, SyncOptions};
//! use std::sync::Arc;
//!
//! # async fn example() -> sftp2s3::error::Result<()> {
//! let source = SftpSource::connect(Default::default(), 4)?;
//! let store = S3Store::new(S3Config {
//!     bucket: "backups".to_string(),
//!     ..Default::default()
//! })
//! .await?;
//!
//! let coordinator = SyncCoordinator::new(
//!     Arc::new(source),
//!     Arc::new(store),
//!     SyncOptions {
//!         marker_key: "state/last-sync".to_string(),
//!         ..Default::default()
//!     },
//! );
//!
//! let report = coordinator.run().await?;
//! report.print_summary();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod source;
pub mod storage;
pub mod sync;

// Re-export commonly used types
pub use error::{Result, SyncError};
pub use source::{FileEntry, FileSource};
pub use storage::ObjectStore;
pub use sync::{RunReport, SyncCoordinator, SyncMarker, SyncPlan};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use sftp2s3::prelude::*;
    //! ```

    pub use crate::config::{CliArgs, Settings};
    pub use crate::error::{Result, SyncError};
    pub use crate::source::{FileEntry, FileSource, SftpConfig, SftpSource};
    pub use crate::storage::{ObjectMeta, ObjectStore, S3Config, S3Store};
    pub use crate::sync::{
        plan, RunReport, SyncCoordinator, SyncMarker, SyncOptions, SyncPlan,
    };
}
