//! logmerge - daily log shard merge job

use anyhow::{Context, Result};
use clap::Parser;
use logmerge::{
    config::Config,
    notify::WebhookNotifier,
    orchestrator::Orchestrator,
    storage::S3Store,
};
use logmerge_common::logging::{init_logging, LogConfig, LogLevel};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "logmerge")]
#[command(author, version, about = "Merge yesterday's per-host log shards into one gzip file per host")]
struct Cli {
    /// Env file with store and notification settings
    #[arg(long, env = "ENV_PATH")]
    env_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag-derived defaults
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("logmerge")
        .filter_directives("aws_smithy_runtime=warn,aws_config=warn,hyper=info")
        .build()
        .with_env_overrides()?;

    let _log_guard = init_logging(&log_config)?;

    let config = Config::load(cli.env_file.as_deref()).context("Failed to load configuration")?;
    info!(
        bucket = %config.storage.bucket,
        work_dir = %config.merge.work_dir.display(),
        "Configuration loaded"
    );

    let store = Arc::new(S3Store::new(&config.storage));
    let notifier = Arc::new(WebhookNotifier::new(&config.notify)?);
    let orchestrator = Orchestrator::from_config(&config, store, notifier);

    let report = orchestrator.run_yesterday().await?;

    if !report.is_success() {
        for outcome in report.outcomes.iter().filter(|o| o.is_failure()) {
            error!(hostname = outcome.hostname(), "Host failed");
        }
        anyhow::bail!(
            "{} of {} hosts failed for {}",
            report.failed(),
            report.outcomes.len(),
            report.date
        );
    }

    info!("Merge job complete");
    Ok(())
}
