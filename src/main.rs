use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use prism_sentry::{Engine, LogSink, Settings};

#[derive(Parser, Debug)]
#[command(name = "prism-sentry")]
#[command(about = "Continuous health and SLA monitoring aggregator for PRISM subsystems")]
struct Args {
    /// Path to the sentry configuration file
    #[arg(short, long, default_value = "sentry.toml")]
    config: PathBuf,

    /// Run a single check cycle, print the snapshot to stdout, and exit
    #[arg(long)]
    once: bool,

    /// Override the check interval in seconds
    #[arg(short, long)]
    interval: Option<u64>,

    /// Override the snapshot output path
    #[arg(short, long)]
    snapshot: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut settings = Settings::load(&args.config)?;
    if let Some(path) = args.snapshot {
        settings.snapshot_path = path;
    }
    if let Some(interval) = args.interval {
        settings.interval_secs = interval;
    }
    settings.validate()?;

    let interval = Duration::from_secs(settings.interval_secs);
    let engine = Engine::from_settings(&settings, Arc::new(LogSink))?;

    if args.once {
        let snapshot = engine.run_cycle().await?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    info!(
        subsystems = settings.subsystems.len(),
        interval_secs = settings.interval_secs,
        snapshot = %settings.snapshot_path.display(),
        "starting monitoring engine"
    );

    tokio::select! {
        result = engine.run_forever(interval) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}
