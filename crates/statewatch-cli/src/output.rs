//! Formatted output helpers for CLI commands.

use statewatch_common::types::ContainerName;
use statewatch_core::{StateRecord, WaitOutcome};

/// Formats a registry record as a single status line.
#[must_use]
pub fn format_record(name: &ContainerName, record: &StateRecord) -> String {
    format!(
        "{name} {} (generation {}, changed {})",
        record.state, record.generation, record.changed_at
    )
}

/// Formats a wait outcome for the user.
#[must_use]
pub fn format_outcome(outcome: &WaitOutcome) -> String {
    match outcome {
        WaitOutcome::Matched { state } => format!("reached {state}"),
        WaitOutcome::TimedOut => "timed out waiting for state change".to_owned(),
        WaitOutcome::Cancelled => "interrupted".to_owned(),
    }
}
