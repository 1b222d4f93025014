mod api;
mod calendar;
mod chain;
mod collector;
mod config;
mod dataset;
mod error;
mod report;
mod retry;
mod runner;
mod schedule;
mod types;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::calendar::{parse_target_date, today_local};
use crate::config::Config;
use crate::dataset::DatasetStore;
use crate::error::{AppError, Result};
use crate::runner::CollectorKind;

/// Dated snapshots of the ABC staking pools and the Tesla voting roster.
#[derive(Parser)]
#[command(name = "snapshot", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Collect one snapshot; skipped when the date is not scheduled
    Run {
        #[arg(value_enum)]
        collector: CollectorKind,
        /// Target date: YYYYMMDD or any common date form; defaults to today
        date: Option<String>,
    },
    /// Serve the datasets over HTTP
    Serve {
        /// Overrides API_PORT
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    let result = match cli.command {
        Command::Run { collector, date } => run_collector(&cfg, collector, date.as_deref()).await,
        Command::Serve { port } => serve(&cfg, port.unwrap_or(cfg.api_port)).await,
    };

    if let Err(e) = result {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run_collector(cfg: &Config, kind: CollectorKind, date: Option<&str>) -> Result<()> {
    let date = parse_target_date(date, today_local())?;
    info!(collector = %kind, snapshot_date = %date, "Starting {kind} for {date}");
    match runner::run(kind, cfg, date).await {
        Ok(()) => Ok(()),
        // Pool collectors report per-source failures in the log only.
        Err(e @ AppError::Config(_)) => Err(e),
        Err(e) if kind == CollectorKind::TeslaRoster => Err(e),
        Err(e) => {
            error!(collector = %kind, "Collection failed: {e}");
            Ok(())
        }
    }
}

async fn serve(cfg: &Config, port: u16) -> Result<()> {
    let state = ApiState {
        pool_stats: DatasetStore::new(cfg.pool_stats_path()),
        roster: DatasetStore::new(cfg.roster_path()),
    };
    let app = router(state);
    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}, data dir {}", cfg.data_dir.display());

    axum::serve(listener, app).await?;

    Ok(())
}
