//! auto-docs
//!
//! Mirrors a git-hosted markdown tree and serves it as rendered pages.

mod daemon;
mod http;
mod signals;

use anyhow::{Context, Result};
use autodocs_core::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use daemon::Daemon;

#[derive(Parser)]
#[command(name = "autodocs")]
#[command(about = "auto-docs - serve a git-hosted markdown tree over HTTP")]
#[command(version)]
struct Cli {
    /// Configuration file (default: ~/.ad.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the documentation server
    Server,

    /// Print version information
    Version,
}

/// Run the daemon
pub async fn run(config: Config) -> Result<()> {
    let daemon = Daemon::new(config)?;
    daemon.run().await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("autodocs {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Server => {
            let config =
                Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

            // Initialize logging
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
                )
                .with_target(false)
                .init();

            tracing::info!("Starting {} v{}", config.name, env!("CARGO_PKG_VERSION"));

            // Run async runtime
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(run(config))
        }
    }
}
