//! `swatch status` — Print the current state of a container.

use std::path::Path;
use std::process::ExitCode;

use clap::Args;
use statewatch_common::types::ContainerName;
use statewatch_core::ipc::MonitorClient;

use crate::output;

/// Arguments for the `status` command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Name of the container to query.
    #[arg(short, long)]
    pub name: String,
}

/// Executes the `status` command.
///
/// A container that has never published prints as `unknown`; that is
/// not a failure.
///
/// # Errors
///
/// Returns an error if the monitor is unreachable.
pub fn execute(args: &StatusArgs, socket: &Path) -> anyhow::Result<ExitCode> {
    let name = ContainerName::new(args.name.as_str());
    let client = MonitorClient::new(socket);

    match client.status(&name)? {
        Some(record) => println!("{}", output::format_record(&name, &record)),
        None => println!("{name} unknown"),
    }
    Ok(ExitCode::SUCCESS)
}
