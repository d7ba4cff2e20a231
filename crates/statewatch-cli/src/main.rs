//! # swatch — statewatch CLI
//!
//! Thin shell over the state monitor core: hosts a monitoring domain,
//! publishes transitions on behalf of a container runtime, and waits
//! for containers to reach requested states.

mod commands;
mod output;

use std::process::ExitCode;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::execute(cli)
}
