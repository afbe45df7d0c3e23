use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use provenance_core::config::default_accept;
use provenance_core::endpoints::NewEndpoint;
use provenance_core::feed::parse_opml_file;
use provenance_core::AppConfig;

mod commands;

#[derive(Parser)]
#[command(name = "provenance")]
#[command(author, version, about = "Polls feed endpoints on a schedule and collects their articles")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (defaults to ~/.config/provenance/config.toml)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// OPML file with additional endpoints to poll
    #[arg(long, global = true)]
    opml: Option<PathBuf>,

    /// Override the tick interval in seconds
    #[arg(short = 'i', long, global = true)]
    interval: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the store and poll endpoints until Ctrl+C
    Run,
    /// Seed the store, run a single tick and print the articles
    Once {
        /// Print articles as JSON
        #[arg(long)]
        json: bool,
        /// Only list available articles
        #[arg(long)]
        available: bool,
    },
    /// Validate the configuration and list the endpoints
    Check,
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::load()?,
    };

    if let Some(secs) = cli.interval {
        config.scheduler.interval_secs = secs;
    }
    config.validate()?;

    Ok(config)
}

fn load_extra_endpoints(cli: &Cli) -> Result<Vec<NewEndpoint>> {
    let Some(path) = &cli.opml else {
        return Ok(Vec::new());
    };

    let entries = parse_opml_file(path)
        .with_context(|| format!("failed to read OPML file {}", path.display()))?;
    let accept = default_accept();

    Ok(entries.iter().map(|entry| entry.to_endpoint(&accept)).collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let extra = load_extra_endpoints(&cli)?;

    match cli.command {
        Some(Commands::Run) | None => commands::run::run(&config, &extra).await,
        Some(Commands::Once { json, available }) => {
            commands::once::run(&config, &extra, json, available).await
        }
        Some(Commands::Check) => commands::check::run(&config, &extra),
    }
}
