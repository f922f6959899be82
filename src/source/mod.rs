//! Remote source module
//!
//! Provides the source-listing capability: enumerate every regular file
//! under a remote directory tree and read individual files. The SFTP
//! adapter is the production implementation.

mod listing;
mod sftp;

pub use listing::{FileEntry, FileSource};
pub use sftp::{SftpConfig, SftpConnection, SftpPool, SftpSource};
