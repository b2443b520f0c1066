//! # lockstep
//!
//! CLI tool for exercising the Lockstep Sync protocol.
//!
//! ## Commands
//!
//! - `simulate`: Run an in-process group and report delivery lateness
//! - `config`: Validate a config file and print the effective settings
//!
//! ## Example
//!
//! ```bash
//! # Five peers, 10% message loss, eight calls
//! lockstep simulate --peers 5 --loss 0.1 --calls 8
//!
//! # Check a config file
//! lockstep config group.toml
//!
//! # More detail
//! RUST_LOG=lockstep_sync_client=debug lockstep simulate
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::{config, simulate};

/// CLI tool for exercising the Lockstep Sync protocol.
#[derive(Parser, Debug)]
#[command(name = "lockstep")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a simulated group in this process
    Simulate {
        /// Number of nodes (the first one leads)
        #[arg(long, default_value = "4")]
        peers: usize,

        /// Probability that a broadcast is lost on the way to a peer
        #[arg(long, default_value = "0.0")]
        loss: f64,

        /// Number of calls the leader makes
        #[arg(long, default_value = "5")]
        calls: u32,

        /// Seconds between issuing a call and running it
        #[arg(long, default_value = "0.5")]
        offset: f64,

        /// Highest peer ping in seconds
        #[arg(long, default_value = "0.08")]
        max_ping: f64,

        /// Seed for the loss generator
        #[arg(long, default_value = "1")]
        seed: u64,

        /// Group config file (TOML)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// Validate a config file and print the effective settings
    Config {
        /// Config file (defaults are printed when omitted)
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Simulate {
            peers,
            loss,
            calls,
            offset,
            max_ping,
            seed,
            config: config_path,
        } => {
            let group_config = config::load(config_path.as_deref())?;
            let options = simulate::SimulateOptions {
                peers,
                loss,
                calls,
                offset,
                max_ping,
                seed,
                config: group_config,
            };
            let report = simulate::run(options).await?;
            simulate::print_report(&report);
        }
        Commands::Config { path } => {
            config::run(path.as_deref())?;
        }
    }

    Ok(())
}
