// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Arkiv - a Telegram attachment archiver with a durable download queue.
//!
//! This is the binary entry point: `serve` runs the bot and ingestion
//! pipeline, `worker` runs a download worker against the shared queue, and
//! `stats` prints queue and failure statistics.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;
mod stats;
mod worker;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;

/// Arkiv - a Telegram attachment archiver.
#[derive(Parser, Debug)]
#[command(name = "arkiv", version, about, long_about = None)]
struct Cli {
    /// Path to a config file (overrides the XDG lookup).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the Telegram bot and ingestion pipeline.
    Serve,
    /// Run a download worker against the shared job queue.
    Worker {
        /// Worker identity recorded on claimed jobs. Defaults to worker-<pid>.
        #[arg(long)]
        id: Option<String>,
    },
    /// Print job queue and failure statistics.
    Stats {
        /// Restrict failure statistics to one month (YYYY-MM).
        #[arg(long)]
        month: Option<String>,
    },
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the default.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("arkiv=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    let config = match &cli.config {
        Some(path) => arkiv_config::load_and_validate_path(path),
        None => arkiv_config::load_and_validate(),
    };
    let config = match config {
        Ok(config) => config,
        Err(errors) => {
            arkiv_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Worker { id } => worker::run_worker(config, id).await,
        Commands::Stats { month } => stats::run_stats(config, month).await,
    };

    if let Err(e) = result {
        error!(error = %e, "arkiv exited with an error");
        eprintln!("arkiv: {e}");
        std::process::exit(1);
    }
}
