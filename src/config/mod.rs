//! Configuration module for sftp2s3
//!
//! Provides the CLI surface, YAML config file parsing, environment
//! overrides, and validation into the typed configs the engine consumes.

mod settings;

pub use settings::*;
