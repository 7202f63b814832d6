//! Command-line interface for attendance-sync
//!
//! # Usage Examples
//!
//! ## Replication
//! ```bash
//! # Poll every 10 seconds until Ctrl+C
//! attendance-sync replicate \
//!   --source-connection-string "server=tcp:127.0.0.1,1433;user id=sync;password=...;database=biotime" \
//!   --destination-connection-string "host=10.0.0.5 user=postgres password=... dbname=casa"
//!
//! # Larger pages, slower polling, no per-operation timeout
//! attendance-sync replicate --batch-size 20000 --interval 1m --store-timeout 0 ...
//!
//! # Single cycle, e.g. from an external scheduler
//! attendance-sync once ...
//! ```
//!
//! ## Maintenance
//! ```bash
//! attendance-sync maintenance --config maintenance.toml
//! attendance-sync maintenance --config maintenance.toml --once
//! ```
//!
//! Connection strings can also be passed as `SOURCE_CONNECTION_STRING` and
//! `DESTINATION_CONNECTION_STRING`.

use std::path::PathBuf;

use anyhow::Context;
use attendance_sync::config::MaintenanceConfig;
use attendance_sync::maintenance::MaintenanceRunner;
use attendance_sync::{replicate, shutdown, DestinationOpts, ReplicationOpts, SourceOpts};
use clap::{Parser, Subcommand};
use sync_core::CycleOutcome;

#[derive(Parser)]
#[command(name = "attendance-sync")]
#[command(about = "Replicates attendance device logs from SQL Server to PostgreSQL")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Continuously copy new log rows into the destination
    Replicate {
        /// Source SQL Server options
        #[command(flatten)]
        from_opts: SourceOpts,

        /// Destination PostgreSQL options
        #[command(flatten)]
        to_opts: DestinationOpts,

        /// Loop options
        #[command(flatten)]
        replication: ReplicationOpts,
    },

    /// Run a single replication cycle and exit
    Once {
        /// Source SQL Server options
        #[command(flatten)]
        from_opts: SourceOpts,

        /// Destination PostgreSQL options
        #[command(flatten)]
        to_opts: DestinationOpts,

        /// Loop options (the interval is ignored)
        #[command(flatten)]
        replication: ReplicationOpts,
    },

    /// Print the highest id already present in the destination
    Watermark {
        /// Destination PostgreSQL options
        #[command(flatten)]
        to_opts: DestinationOpts,
    },

    /// Run maintenance commands and clear the cache directory periodically
    Maintenance {
        /// TOML file listing the commands and the cache directory
        #[arg(long, value_name = "PATH")]
        config: PathBuf,

        /// Run a single pass and exit
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replicate {
            from_opts,
            to_opts,
            replication,
        } => {
            replicate::run_replication(from_opts, to_opts, replication).await?;
        }
        Commands::Once {
            from_opts,
            to_opts,
            replication,
        } => match replicate::run_once(from_opts, to_opts, replication).await? {
            CycleOutcome::Empty { watermark } => {
                tracing::info!("No new records to insert (watermark {watermark})");
            }
            CycleOutcome::Applied {
                watermark,
                inserted,
                page_full,
            } => {
                tracing::info!("Inserted {inserted} new records above watermark {watermark}");
                if page_full {
                    tracing::info!("More records are pending; run again to continue");
                }
            }
        },
        Commands::Watermark { to_opts } => {
            let watermark = replicate::read_watermark(to_opts).await?;
            println!("{watermark}");
        }
        Commands::Maintenance { config, once } => {
            let config = MaintenanceConfig::from_file(&config)?;
            let runner =
                MaintenanceRunner::new(config).context("Invalid maintenance configuration")?;
            if once {
                let report = runner.run_pass().await;
                if report.commands_failed > 0 {
                    anyhow::bail!("{} maintenance commands failed", report.commands_failed);
                }
            } else {
                runner.run(shutdown::setup_shutdown_handler()).await;
            }
        }
    }

    Ok(())
}
