//! Main entry point for the nio_lab CLI

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger; RUST_LOG still wins over the verbosity flags.
    let default_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Some(port) = cli.metrics_port {
        nio_lab::telemetry::install_prometheus(port)?;
    }

    commands::execute(cli.command)
}
