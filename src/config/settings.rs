//! Configuration settings for sftp2s3
//!
//! Defines the CLI surface and the YAML configuration file, including
//! the `S3_SFTP_SYNC__*` environment-variable overrides. The config
//! layer validates everything up front; the sync engine treats its
//! inputs as already validated.

use crate::error::{Result, SyncError};
use crate::source::SftpConfig;
use crate::storage::S3Config;
use crate::sync::SyncOptions;
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default transfer concurrency
const DEFAULT_CONCURRENCY: usize = 4;

/// Default TCP connect timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// sftp2s3 - Incremental SFTP to S3 synchronization
#[derive(Parser, Debug, Clone)]
#[command(name = "sftp2s3")]
#[command(author = "SmartCopy Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sync new and modified files from an SFTP tree to an S3 bucket")]
#[command(long_about = r#"
sftp2s3 synchronizes a directory tree on an SFTP server to an S3 bucket,
transferring only files modified since the last successful run. The
watermark of the last run is persisted as a small object in the bucket
itself and advances only after every planned transfer succeeded.

Examples:
  sftp2s3                                  # Sync using ./config.conf
  sftp2s3 --config-file /etc/sftp2s3.conf  # Explicit config path
  sftp2s3 --dry-run                        # Show the plan, change nothing
  sftp2s3 --output-format json             # Machine-readable run report
"#)]
pub struct CliArgs {
    /// Path to config file
    #[arg(long, default_value = "./config.conf", value_name = "PATH")]
    pub config_file: PathBuf,

    /// Default logging level (RUST_LOG overrides)
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Run report format
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,

    /// Plan and report without transferring or committing
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

/// Logging verbosity
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Everything, including per-file decisions
    Debug,
    /// Run progress and summaries
    #[default]
    Info,
    /// Problems only
    Warn,
    /// Failures only
    Error,
}

impl LogLevel {
    /// The `EnvFilter` directive for this level
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Output format for the run report
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// JSON report
    Json,
}

/// The `sftp` section of the config file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SftpSection {
    /// Remote hostname or IP
    pub hostname: Option<String>,
    /// Username
    pub username: Option<String>,
    /// Password (key file and agent are tried when unset)
    pub password: Option<String>,
    /// Private key path
    pub key_path: Option<PathBuf>,
    /// SSH port, default 22
    pub port: Option<u16>,
    /// Root of the tree to sync, default "."
    pub root: Option<String>,
    /// Resolve symlinks instead of skipping them
    #[serde(default)]
    pub follow_symlinks: bool,
    /// TCP connect timeout, default 5 seconds
    pub connect_timeout_secs: Option<u64>,
}

/// The `s3` section of the config file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct S3Section {
    /// Destination bucket
    pub bucket: Option<String>,
    /// Prefix prepended to every destination key
    pub key_prefix: Option<String>,
    /// AWS region
    pub region: Option<String>,
    /// Custom endpoint URL for S3-compatible services
    pub endpoint_url: Option<String>,
    /// Access key ID (ambient AWS credential chain when unset)
    pub access_key_id: Option<String>,
    /// Secret access key
    pub secret_access_key: Option<String>,
    /// Force path-style access
    #[serde(default)]
    pub force_path_style: bool,
    /// Retries per S3 operation
    pub max_retries: Option<u32>,
}

/// The `incremental_sync` section of the config file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct IncrementalSyncSection {
    /// Destination key of the watermark object
    #[serde(alias = "last_modified_s3_key")]
    pub marker_key: Option<String>,
    /// Bounded transfer concurrency, default 4
    pub concurrency: Option<usize>,
}

/// Parsed configuration file with environment overrides applied
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    /// SFTP source endpoint
    #[serde(default)]
    pub sftp: SftpSection,
    /// S3 destination
    #[serde(default)]
    pub s3: S3Section,
    /// Watermark and run behavior
    #[serde(default)]
    pub incremental_sync: IncrementalSyncSection,
}

impl Settings {
    /// Load the YAML config file and apply `S3_SFTP_SYNC__*` overrides
    /// from the process environment.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SyncError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        tracing::info!("Loading config from {}...", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        let mut settings: Settings = serde_yaml::from_str(&text).map_err(|e| {
            SyncError::config(format!("Unable to parse configuration file: {e}"))
        })?;

        settings.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Apply environment-variable overrides through a lookup function.
    ///
    /// A variable that is set always wins over the file, including when
    /// it is set to the empty string; validation rejects empty required
    /// values afterwards.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("S3_SFTP_SYNC__S3_BUCKET") {
            self.s3.bucket = Some(value);
        }
        if let Some(value) = lookup("S3_SFTP_SYNC__S3_KEY_PREFIX") {
            self.s3.key_prefix = Some(value);
        }
        if let Some(value) = lookup("S3_SFTP_SYNC__S3_REGION") {
            self.s3.region = Some(value);
        }
        if let Some(value) = lookup("S3_SFTP_SYNC__S3_ENDPOINT_URL") {
            self.s3.endpoint_url = Some(value);
        }
        if let Some(value) = lookup("S3_SFTP_SYNC__AWS_ACCESS_KEY_ID") {
            self.s3.access_key_id = Some(value);
        }
        if let Some(value) = lookup("S3_SFTP_SYNC__AWS_SECRET_ACCESS_KEY") {
            self.s3.secret_access_key = Some(value);
        }
        if let Some(value) = lookup("S3_SFTP_SYNC__SFTP_HOSTNAME") {
            self.sftp.hostname = Some(value);
        }
        if let Some(value) = lookup("S3_SFTP_SYNC__SFTP_USERNAME") {
            self.sftp.username = Some(value);
        }
        if let Some(value) = lookup("S3_SFTP_SYNC__SFTP_PASSWORD") {
            self.sftp.password = Some(value);
        }
        if let Some(value) = lookup("S3_SFTP_SYNC__SFTP_PORT") {
            match value.parse::<u16>() {
                Ok(port) => self.sftp.port = Some(port),
                Err(_) => tracing::warn!("Ignoring non-numeric S3_SFTP_SYNC__SFTP_PORT: {value}"),
            }
        }
        if let Some(value) = lookup("S3_SFTP_SYNC__SFTP_LAST_MODIFIED_S3_KEY") {
            self.incremental_sync.marker_key = Some(value);
        }
    }

    /// Validated SFTP endpoint configuration
    pub fn sftp_config(&self) -> Result<SftpConfig> {
        let host = required(&self.sftp.hostname, "sftp.hostname")?;
        let user = required(&self.sftp.username, "sftp.username")?;

        Ok(SftpConfig {
            host,
            port: self.sftp.port.unwrap_or(22),
            user,
            password: self.sftp.password.clone().filter(|s| !s.is_empty()),
            key_path: self.sftp.key_path.clone(),
            root: self
                .sftp
                .root
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| ".".to_string()),
            follow_symlinks: self.sftp.follow_symlinks,
            connect_timeout: Duration::from_secs(
                self.sftp
                    .connect_timeout_secs
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
        })
    }

    /// Validated S3 destination configuration.
    ///
    /// Credentials may be omitted together to use the ambient AWS
    /// credential chain; supplying only one of the pair is an error.
    pub fn s3_config(&self) -> Result<S3Config> {
        let bucket = required(&self.s3.bucket, "s3.bucket")?;

        let access_key_id = self.s3.access_key_id.clone().filter(|s| !s.is_empty());
        let secret_access_key = self.s3.secret_access_key.clone().filter(|s| !s.is_empty());
        if access_key_id.is_some() != secret_access_key.is_some() {
            return Err(SyncError::config(
                "s3.access_key_id and s3.secret_access_key must be set together",
            ));
        }

        let default_s3 = S3Config::default();
        Ok(S3Config {
            bucket,
            region: self
                .s3
                .region
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or(default_s3.region),
            endpoint_url: self.s3.endpoint_url.clone().filter(|s| !s.is_empty()),
            max_retries: self.s3.max_retries.unwrap_or(default_s3.max_retries),
            force_path_style: self.s3.force_path_style,
            access_key_id,
            secret_access_key,
        })
    }

    /// Validated run options
    pub fn sync_options(&self, dry_run: bool) -> Result<SyncOptions> {
        let marker_key = required(&self.incremental_sync.marker_key, "incremental_sync.marker_key")?;

        Ok(SyncOptions {
            key_prefix: self.s3.key_prefix.clone().unwrap_or_default(),
            marker_key,
            concurrency: self
                .incremental_sync
                .concurrency
                .unwrap_or(DEFAULT_CONCURRENCY)
                .max(1),
            dry_run,
        })
    }
}

/// Extract a required, non-empty setting
fn required(value: &Option<String>, name: &str) -> Result<String> {
    value
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SyncError::config(format!("{name} must be set")))
}
