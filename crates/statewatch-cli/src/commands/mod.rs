//! CLI command definitions and dispatch.

pub mod monitor;
pub mod publish;
pub mod status;
pub mod wait;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// statewatch — container state monitor.
#[derive(Parser, Debug)]
#[command(name = "swatch", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to the monitor socket.
    #[arg(long, global = true)]
    pub socket: Option<PathBuf>,
}

impl Cli {
    /// Returns the monitor socket path, defaulting to the configured
    /// data directory.
    #[must_use]
    pub fn socket_path(&self) -> PathBuf {
        self.socket
            .clone()
            .unwrap_or_else(|| statewatch_common::config::StatewatchConfig::default().socket_path)
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Host a monitoring domain on the monitor socket.
    Monitor(monitor::MonitorArgs),
    /// Announce a container state transition.
    Publish(publish::PublishArgs),
    /// Print the current state of a container.
    Status(status::StatusArgs),
    /// Block until a container reaches one of the given states.
    Wait(wait::WaitArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let socket = cli.socket_path();
    match cli.command {
        Command::Monitor(args) => monitor::execute(&args, &socket),
        Command::Publish(args) => publish::execute(&args, &socket),
        Command::Status(args) => status::execute(&args, &socket),
        Command::Wait(args) => wait::execute(&args, &socket),
    }
}
