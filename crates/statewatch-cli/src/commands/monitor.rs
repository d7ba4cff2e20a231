//! `swatch monitor` — Host a monitoring domain.
//!
//! Owns the registry and fan-out for one domain and serves them over
//! the monitor socket until interrupted.

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use statewatch_core::ipc::MonitorServer;
use statewatch_core::{CancelToken, StateMonitor};

/// Arguments for the `monitor` command.
#[derive(Args, Debug)]
pub struct MonitorArgs {}

/// Executes the `monitor` command, blocking until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound or the signal
/// handler cannot be installed.
pub fn execute(_args: &MonitorArgs, socket: &Path) -> anyhow::Result<ExitCode> {
    if let Some(parent) = socket.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let monitor = StateMonitor::new();
    let server = MonitorServer::bind(socket, monitor)?;
    eprintln!("swatch: monitoring on {}", socket.display());
    let _ = server.spawn();

    let token = CancelToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("failed to install signal handler")?;

    while !token.is_cancelled() {
        std::thread::sleep(Duration::from_millis(200));
    }

    tracing::info!(socket = %socket.display(), "monitor shutting down");
    let _ = std::fs::remove_file(socket);
    Ok(ExitCode::SUCCESS)
}
