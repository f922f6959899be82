//! Native AWS S3 destination adapter
//!
//! Direct AWS SDK access with connection-pooled HTTP requests. Supports
//! S3-compatible endpoints (MinIO, Wasabi, etc.), static credentials or
//! the ambient AWS credential chain, and exponential backoff retry.

use crate::error::{Result, SyncError};
use crate::storage::{ObjectMeta, ObjectStore};
use async_trait::async_trait;
use std::time::Duration;

/// Maximum retry delay cap in seconds.
const MAX_RETRY_DELAY_SECS: u64 = 64;

/// Configuration for the S3 destination.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Destination bucket
    pub bucket: String,
    /// AWS region (e.g., "us-east-1")
    pub region: String,
    /// Custom endpoint URL for S3-compatible services (MinIO, Wasabi)
    pub endpoint_url: Option<String>,
    /// Maximum number of retries per operation
    pub max_retries: u32,
    /// Force path-style access (required for some S3-compatible services)
    pub force_path_style: bool,
    /// Access key ID (optional, falls back to AWS credential chain)
    pub access_key_id: Option<String>,
    /// Secret access key (optional, falls back to AWS credential chain)
    pub secret_access_key: Option<String>,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
            max_retries: 5,
            force_path_style: false,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

/// S3-backed [`ObjectStore`]
pub struct S3Store {
    client: aws_sdk_s3::Client,
    config: S3Config,
}

impl S3Store {
    /// Create a new store from configuration.
    pub async fn new(config: S3Config) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(SyncError::config("S3 bucket must be set"));
        }

        let mut aws_config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let Some(ref endpoint) = config.endpoint_url {
            aws_config_builder = aws_config_builder.endpoint_url(endpoint);
        }

        if let (Some(ref key_id), Some(ref secret)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let creds = aws_credential_types::Credentials::new(
                key_id,
                secret,
                None, // session token
                None, // expiry
                "sftp2s3-static",
            );
            aws_config_builder = aws_config_builder.credentials_provider(creds);
        }

        let aws_config = aws_config_builder.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&aws_config);
        if config.force_path_style {
            s3_config = s3_config.force_path_style(true);
        }

        let client = aws_sdk_s3::Client::from_conf(s3_config.build());

        Ok(Self { client, config })
    }

    /// Destination bucket name
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Attempt a single put.
    async fn try_put(&self, key: &str, body: Vec<u8>, meta: &ObjectMeta) -> Result<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(body.into());

        if let Some(mtime) = meta.source_mtime {
            request = request
                .metadata("sftp_mtime", mtime.to_string())
                .metadata("sftp_sync_time", chrono::Utc::now().to_rfc3339());
        }

        request
            .send()
            .await
            .map_err(|e| SyncError::storage(key, format!("S3 put_object failed: {e}")))?;

        Ok(())
    }

    /// Attempt a single get; `Ok(None)` when the key does not exist.
    async fn try_get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await;

        let output = match response {
            Ok(output) => output,
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false)
                {
                    return Ok(None);
                }
                return Err(SyncError::storage(
                    key,
                    format!("S3 get_object failed: {err}"),
                ));
            }
        };

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| SyncError::storage(key, format!("S3 body read failed: {e}")))?;

        Ok(Some(body.into_bytes().to_vec()))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(&self, key: &str, body: Vec<u8>, meta: &ObjectMeta) -> Result<()> {
        let mut retries = 0;
        loop {
            match self.try_put(key, body.clone(), meta).await {
                Ok(()) => return Ok(()),
                Err(e) if retries < self.config.max_retries => {
                    retries += 1;
                    let delay = exponential_backoff_delay(retries);
                    tracing::warn!(
                        "S3 put failed (attempt {}/{}): {}. Retrying in {:?}",
                        retries,
                        self.config.max_retries,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut retries = 0;
        loop {
            match self.try_get(key).await {
                Ok(value) => return Ok(value),
                Err(e) if retries < self.config.max_retries => {
                    retries += 1;
                    let delay = exponential_backoff_delay(retries);
                    tracing::warn!(
                        "S3 get failed (attempt {}/{}): {}. Retrying in {:?}",
                        retries,
                        self.config.max_retries,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Calculate exponential backoff delay: 2^retries seconds, capped at MAX_RETRY_DELAY_SECS.
fn exponential_backoff_delay(retries: u32) -> Duration {
    let secs = (1u64 << retries).min(MAX_RETRY_DELAY_SECS);
    Duration::from_secs(secs)
}
