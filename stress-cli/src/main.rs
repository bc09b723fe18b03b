//! # rados-stress
//!
//! Drives a RADOS stress run across a cluster's client roles.
//!
//! ## Commands
//!
//! - `run`: Launch one stress process per client role and wait for all of them
//! - `plan`: Show the command each client would run, without launching
//!
//! ## Example
//!
//! ```bash
//! # Inspect what would be launched
//! rados-stress --config smoke.toml plan
//!
//! # Run, killing anything still alive after an hour
//! rados-stress --config smoke.toml run --timeout-secs 3600
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

use commands::{plan, run};
use config::RunFile;

/// Drives RADOS stress runs.
#[derive(Parser, Debug)]
#[command(name = "rados-stress")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Run file describing workload, hosts and launch settings
    #[arg(long, short, global = true, default_value = "rados-stress.toml")]
    config: PathBuf,

    /// More logging (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch all clients and wait for them to finish
    Run {
        /// Kill clients still running after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Hold the run open this long before joining (ctrl-c ends early)
        #[arg(long)]
        hold_secs: Option<u64>,
    },

    /// Show the resolved launch plan
    Plan {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let file = RunFile::load(&cli.config)?;

    match cli.command {
        Commands::Run {
            timeout_secs,
            hold_secs,
        } => {
            run::run(&file, timeout_secs, hold_secs).await?;
        }
        Commands::Plan { json } => {
            plan::run(&file, json)?;
        }
    }

    Ok(())
}

/// Log to stderr; stdout carries command output.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,rados_stress={}", level))
    });
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
