//! Sensor intake service.
//!
//! Run with: `cargo run -p intake-service`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use intake_core::{Validator, Verdict};
use intake_service::{Config, FolderMonitor, PipelineContext};
use intake_store::Store;

/// Watch a folder for sensor files and store them.
#[derive(Parser, Debug)]
#[command(name = "intake-service")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data folder to watch (overrides config and environment).
    #[arg(long, global = true)]
    data_folder: Option<PathBuf>,

    /// Database path (overrides config and environment).
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch the data folder (default behavior).
    Run {
        /// Scan once and exit instead of polling forever.
        #[arg(long)]
        once: bool,
    },

    /// Validate a file without storing or moving it.
    Check {
        /// File to validate.
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("intake_service=info".parse()?)
                .add_directive("intake_core=info".parse()?)
                .add_directive("intake_store=info".parse()?),
        )
        .init();

    match args.command {
        Some(Command::Check { ref file }) => check(file),
        Some(Command::Run { once }) => run(&args, once).await,
        None => run(&args, false).await,
    }
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    config.apply_env()?;

    if let Some(folder) = &args.data_folder {
        config.intake.data_folder = folder.clone();
    }
    if let Some(db_path) = &args.database {
        config.storage.path = db_path.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn run(args: &Args, once: bool) -> anyhow::Result<()> {
    let config = load_config(args)?;

    let store = Store::open(&config.storage.path)
        .with_context(|| format!("cannot open database at {}", config.storage.path.display()))?;

    let ctx = PipelineContext::from_config(&config, Arc::new(store));
    ctx.ensure_dirs().context("cannot create intake folders")?;

    let mut monitor = FolderMonitor::new(ctx, config.intake.interval());
    if once {
        let report = monitor.poll_once().await?;
        info!(
            "{} processed, {} quarantined, {} failed",
            report.processed(),
            report.quarantined(),
            report.failed()
        );
        return Ok(());
    }

    monitor.run().await;
    Ok(())
}

fn check(file: &Path) -> anyhow::Result<()> {
    match Validator::default().validate_file(file)? {
        Verdict::Accepted(batch) => {
            println!("{}: OK ({} readings)", file.display(), batch.len());
            Ok(())
        }
        Verdict::Rejected(rejection) => bail!("{}: rejected: {}", file.display(), rejection),
    }
}
