//! sftp2s3 CLI - Incremental SFTP to S3 Sync
//!
//! One run per invocation: list, plan, transfer, commit. The process
//! exits non-zero whenever any entry failed or the watermark could not
//! be committed.

use clap::Parser;
use sftp2s3::config::{CliArgs, LogFormat, OutputFormat, Settings};
use sftp2s3::error::{Result, SyncError};
use sftp2s3::source::SftpSource;
use sftp2s3::storage::S3Store;
use sftp2s3::sync::SyncCoordinator;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(&args);

    if let Err(e) = run(args).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(args: &CliArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_directive()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match args.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(args: CliArgs) -> Result<()> {
    let settings = Settings::load(&args.config_file)?;
    let sftp_config = settings.sftp_config()?;
    let s3_config = settings.s3_config()?;
    let options = settings.sync_options(args.dry_run)?;

    tracing::info!(
        "Connecting to SFTP {} on port {}...",
        sftp_config.host,
        sftp_config.port
    );
    let host = sftp_config.host.clone();
    let pool_size = options.concurrency;
    let source = tokio::task::spawn_blocking(move || SftpSource::connect(sftp_config, pool_size))
        .await
        .map_err(|e| SyncError::connection(host, e.to_string()))??;
    tracing::info!("SFTP connected.");

    let store = S3Store::new(s3_config).await?;

    let coordinator = SyncCoordinator::new(Arc::new(source), Arc::new(store), options);
    let report = coordinator.run().await?;

    match args.output_format {
        OutputFormat::Text => report.print_summary(),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| SyncError::config(format!("report serialization failed: {e}")))?;
            println!("{json}");
        }
    }

    if !report.is_success() {
        std::process::exit(1);
    }

    Ok(())
}
