use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meeple_core::{
    catalog::{Game, GameCatalog},
    clustering::{ClusterItem, ClusterManager, ThresholdScaling},
    config::Config,
};

#[derive(Parser)]
#[command(name = "meeple-core")]
#[command(version)]
#[command(about = "Query the board game catalog and try out map clustering")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path (defaults to $MEEPLE_CONFIG or meeple.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch games by catalog id
    Game {
        /// One or more catalog ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Search games by name
    Search {
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        max: usize,

        /// Match names case-sensitively
        #[arg(long)]
        case_sensitive: bool,
    },
    /// Cluster points read from a JSON array of {"lat", "lng"} objects
    Cluster {
        points: PathBuf,

        /// Map zoom level
        #[arg(short, long)]
        zoom: f32,

        /// Zoom-to-distance scaling (overrides the config file)
        #[arg(short, long)]
        scaling: Option<ThresholdScaling>,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Serialize)]
struct BatchOutput<'a> {
    games: &'a [Game],
    errors: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let log_filter = format!("meeple_core={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };
    info!("meeple-core v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Game { ids } => {
            let catalog = GameCatalog::from_config(&config)?;
            let batch = catalog.get_games_by_id_with_errors(&ids).await?;
            let output = BatchOutput {
                games: &batch.games,
                errors: batch.errors.iter().map(ToString::to_string).collect(),
            };
            print_json(&output)?;
        }
        Command::Search {
            query,
            max,
            case_sensitive,
        } => {
            let catalog = GameCatalog::from_config(&config)?;
            let results = catalog
                .search_games_by_name(&query, max, !case_sensitive)
                .await?;
            print_json(&results)?;
        }
        Command::Cluster {
            points,
            zoom,
            scaling,
        } => {
            let contents = std::fs::read_to_string(&points)
                .with_context(|| format!("Failed to read points file {}", points.display()))?;
            let items: Vec<ClusterItem> = serde_json::from_str(&contents)
                .with_context(|| format!("Invalid points file {}", points.display()))?;

            let scaling = scaling.unwrap_or(config.clustering.scaling);
            info!("Clustering {} points at zoom {} ({})", items.len(), zoom, scaling);

            let clusters = ClusterManager::with_scaling(scaling).cluster(items, zoom, |item| *item);
            print_json(&clusters)?;
        }
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
