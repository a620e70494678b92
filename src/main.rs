//! Command line entry point for the ranking engine
//!
//! Runs one batch ranking over a JSON dataset, manages snapshots and answers
//! history queries. Results are printed to stdout as JSON; logs go to stderr.

use anyhow::Result;
use clap::{Parser, Subcommand};
use ranking_engine::config::AppConfig;
use ranking_engine::service::RankingService;
use ranking_engine::types::{Dataset, SnapshotId, TeamId};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

/// Ranking Engine - multi-model team rankings with snapshot history
#[derive(Parser)]
#[command(
    name = "ranking-engine",
    version,
    about = "Rank teams from match results and track rankings over time",
    long_about = "Ranking Engine fuses Colley, Massey, Elo, margin-aware Elo, TrueSkill, \
                 PageRank and Bradley-Terry ratings into one composite 0-100 score with a \
                 confidence band, stores each run as a snapshot, and compares snapshots."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Snapshot database override
    #[arg(long, value_name = "FILE", help = "Override SQLite snapshot database path")]
    database: Option<PathBuf>,

    /// Admin key used for protected operations
    #[arg(long, value_name = "KEY", help = "Admin key (defaults to ADMIN_KEY)")]
    admin_key: Option<String>,

    /// Enable the anomaly pass
    #[arg(long, help = "Flag statistical outliers among the ranked teams")]
    anomalies: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute a live ranking without saving it
    Rank {
        #[arg(short, long, value_name = "FILE")]
        data: PathBuf,
    },
    /// Compute a ranking and save it as a new snapshot
    Snapshot {
        #[arg(short, long, value_name = "FILE")]
        data: PathBuf,
    },
    /// List the most recent snapshots
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one snapshot's ranking with variations
    Show { id: SnapshotId },
    /// Compare two snapshots, or one snapshot with its predecessor
    Diff { from: SnapshotId, to: Option<SnapshotId> },
    /// Summarize ranking movement over the last N days
    Evolution {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Delete a snapshot
    Delete { id: SnapshotId },
    /// Keep only the most recent snapshots
    Prune {
        #[arg(long, default_value_t = 10)]
        keep: usize,
    },
    /// Export a snapshot and its rows as JSON
    Export {
        id: SnapshotId,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Rate one team on one map
    MapRating {
        #[arg(short, long, value_name = "FILE")]
        data: PathBuf,
        #[arg(long)]
        team: String,
        #[arg(long)]
        map: String,
    },
    /// A team's position and score across recent snapshots
    TeamHistory {
        team_id: TeamId,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from file or environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if let Some(database) = &args.database {
        config.storage.database_path = Some(database.clone());
    }

    if let Some(admin_key) = &args.admin_key {
        config.service.admin_key = Some(admin_key.clone());
    }

    if args.anomalies {
        config.engine.anomaly.enabled = true;
    }

    ranking_engine::config::validate_config(&config)?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(args: Args, config: AppConfig) -> Result<()> {
    let service = RankingService::from_config(&config)?;
    let admin_key = config.service.admin_key.as_deref();

    match args.command {
        Command::Rank { data } => {
            let dataset = Dataset::from_json_file(&data)?;
            print_json(&service.live_ranking(&dataset.teams, &dataset.matches)?)
        }
        Command::Snapshot { data } => {
            let dataset = Dataset::from_json_file(&data)?;
            let snapshot = service
                .create_snapshot_with_deadline(admin_key, dataset.teams, dataset.matches)
                .await?;
            print_json(&snapshot)
        }
        Command::List { limit } => print_json(&service.list_snapshots(limit)?),
        Command::Show { id } => print_json(&service.snapshot_ranking(id)?),
        Command::Diff { from, to: Some(to) } => print_json(&service.compare(from, to)?),
        Command::Diff { from, to: None } => print_json(&service.compare_with_previous(from)?),
        Command::Evolution { days } => print_json(&service.evolution(days)?),
        Command::Delete { id } => {
            service.delete_snapshot(admin_key, id)?;
            info!("Snapshot #{} deleted", id);
            Ok(())
        }
        Command::Prune { keep } => print_json(&service.prune_snapshots(admin_key, keep)?),
        Command::Export { id, output } => {
            let export = service.export_snapshot(id, &output)?;
            info!(
                "Exported snapshot #{} ({} rows) to {}",
                id,
                export.rows.len(),
                output.display()
            );
            Ok(())
        }
        Command::MapRating { data, team, map } => {
            let dataset = Dataset::from_json_file(&data)?;
            print_json(&service.map_rating(&dataset.matches, &team, &map)?)
        }
        Command::TeamHistory { team_id, limit } => {
            print_json(&service.team_history(team_id, limit)?)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(args, config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
