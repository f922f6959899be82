//! Object storage module
//!
//! Provides the destination capability for S3-compatible object storage:
//! uploaded files and the watermark object both live behind the same
//! put/get seam.

mod object;
mod s3;

#[cfg(test)]
pub(crate) use object::memory;
pub use object::{ObjectMeta, ObjectStore};
pub use s3::{S3Config, S3Store};
