//! `swatch publish` — Announce a container state transition.
//!
//! This is the entry point a container runtime invokes on every
//! lifecycle transition; it returns as soon as the monitor has
//! acknowledged the frame.

use std::path::Path;
use std::process::ExitCode;

use clap::Args;
use statewatch_common::types::{ContainerName, ContainerState};
use statewatch_core::ipc::MonitorClient;

/// Arguments for the `publish` command.
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Name of the container that transitioned.
    #[arg(short, long)]
    pub name: String,

    /// The new state, e.g. `RUNNING`.
    #[arg(short, long)]
    pub state: String,
}

/// Executes the `publish` command.
///
/// # Errors
///
/// Returns an error if the state name is invalid or the monitor is
/// unreachable.
pub fn execute(args: &PublishArgs, socket: &Path) -> anyhow::Result<ExitCode> {
    let state: ContainerState = args.state.parse()?;
    let name = ContainerName::new(args.name.as_str());

    let client = MonitorClient::new(socket);
    client.publish(&name, state)?;
    tracing::info!(container = %name, %state, "transition published");
    Ok(ExitCode::SUCCESS)
}
