//! pkgapi - track published GApps releases and serve the latest one per platform.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "pkgapi")]
#[command(author, version, about = "Release watcher and latest-package API for GApps builds")]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, short, global = true, env = "PKGAPI_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Poll the release source and store new releases until interrupted
    Watch {
        /// Run a single poll cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Print the latest enabled release of every platform as JSON
    List,
    /// Enable or disable every release published on a date
    Pkg {
        /// "enable" or "disable"
        action: String,
        /// Release date, YYYYMMDD
        date: String,
        /// Only change the release for this platform
        #[arg(long)]
        platform: Option<String>,
    },
    /// Print download links for a package as JSON
    Links {
        arch: String,
        /// API level, e.g. 9.0
        api: String,
        variant: String,
        /// Release date, YYYYMMDD
        date: String,
    },
    /// Print every stored release, oldest first, as JSON lines
    History {
        #[arg(long)]
        platform: Option<String>,
    },
    /// Remove every stored release
    Purge {
        /// Confirm removal
        #[arg(long)]
        yes: bool,
    },
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::registry()
        // Standard output is reserved for command results.
        .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::FAILURE
        },
    }
}
