//! `swatch wait` — Block until a container reaches a target state.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Args;
use statewatch_common::types::{ContainerName, StateSet};
use statewatch_core::ipc::MonitorClient;
use statewatch_core::{CancelToken, WaitOutcome};

use crate::output;

/// Arguments for the `wait` command.
#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Name of the container to wait on.
    #[arg(short, long)]
    pub name: String,

    /// ORed states to wait for, e.g. `RUNNING|STOPPED`.
    #[arg(short, long)]
    pub state: String,

    /// Seconds to wait for a state change; negative waits forever,
    /// zero checks the current state without blocking.
    #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
    pub timeout: i64,
}

/// Executes the `wait` command.
///
/// Exit codes follow the outcome: 0 on a match, 1 on timeout, 2 on
/// Ctrl-C.
///
/// # Errors
///
/// Returns an error if the state list is invalid or the monitor is
/// unreachable.
pub fn execute(args: &WaitArgs, socket: &Path) -> anyhow::Result<ExitCode> {
    let targets = StateSet::parse(&args.state)?;
    let name = ContainerName::new(args.name.as_str());

    let token = CancelToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("failed to install signal handler")?;

    tracing::info!(container = %name, %targets, timeout = args.timeout, "waiting");
    let client = MonitorClient::new(socket);
    let outcome = client.wait(&name, targets, args.timeout, &token)?;

    match outcome {
        WaitOutcome::Matched { .. } => {
            println!("{}", output::format_outcome(&outcome));
            Ok(ExitCode::SUCCESS)
        }
        WaitOutcome::TimedOut => {
            eprintln!("swatch: {}", output::format_outcome(&outcome));
            Ok(ExitCode::from(1))
        }
        WaitOutcome::Cancelled => {
            eprintln!("swatch: {}", output::format_outcome(&outcome));
            Ok(ExitCode::from(2))
        }
    }
}
