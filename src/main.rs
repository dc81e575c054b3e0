use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use onepass::checkpoint::{open_store, JobCheckpoints};
use onepass::storage::StorageConfig;
use onepass::RecordId;
use std::path::PathBuf;
use tracing::{debug, error};

/// Inspect and maintain the checkpoints of one-pass jobs
#[derive(Parser)]
#[command(name = "onepass")]
#[command(about = "onepass - Inspect and maintain resumable job checkpoints", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Storage configuration file (TOML). Defaults to ONEPASS_* environment variables.
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show checkpoint keys and set sizes for a job
    Status {
        /// Job description, as given to the job
        description: String,
    },
    /// List checked ids, one per line
    Checked { description: String },
    /// List failed ids, one per line
    Failed { description: String },
    /// Report whether one id was checked and whether it failed
    Check { description: String, id: RecordId },
    /// Delete a job's checkpoint sets so every id is processed again
    Clear { description: String },
}

impl Commands {
    fn description(&self) -> &str {
        match self {
            Self::Status { description }
            | Self::Checked { description }
            | Self::Failed { description }
            | Self::Check { description, .. }
            | Self::Clear { description } => description,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    onepass::logging::init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => StorageConfig::from_file(path)
            .with_context(|| format!("Failed to load storage config from {}", path.display()))?,
        None => StorageConfig::from_env().context("Invalid storage environment")?,
    };
    debug!(backend = ?config.backend, "Using storage configuration");

    let store = open_store(&config)
        .await
        .context("Failed to open checkpoint storage")?;
    let job = JobCheckpoints::new(store, cli.command.description());

    match cli.command {
        Commands::Status { .. } => {
            let summary = job.summary().await?;
            match &summary.backend {
                Some(health) => println!("Backend: {health}"),
                None => println!("Backend: disabled"),
            }
            println!("Job: {}", summary.namespace);
            println!("Checked IDs: {} ({})", summary.checked_key, summary.checked);
            println!("Failed IDs: {} ({})", summary.failed_key, summary.failed);
        }
        Commands::Checked { .. } => {
            for id in job.checked_ids().await? {
                println!("{id}");
            }
        }
        Commands::Failed { .. } => {
            for id in job.failed_ids().await? {
                println!("{id}");
            }
        }
        Commands::Check { id, .. } => {
            let status = match (job.already_run_for(id).await?, job.is_failed(id).await?) {
                (true, true) => "checked, failed",
                (true, false) => "checked",
                (false, _) => "unchecked",
            };
            println!("{id}: {status}");
        }
        Commands::Clear { .. } => {
            job.clear().await?;
            println!("Cleared checkpoints for {}", job.namespace());
        }
    }

    Ok(())
}
