//! Wire frames for the monitor socket.
//!
//! Newline-delimited JSON over a local Unix stream socket, one request
//! per connection. The framing is deliberately minimal: the ordering
//! and race-freedom guarantees live in the in-process monitor that the
//! server wraps, not in the transport.

use std::io::{BufRead, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use statewatch_common::error::{Result, StatewatchError};
use statewatch_common::types::{ContainerName, ContainerState, StateSet};

use crate::registry::StateRecord;
use crate::wait::WaitOutcome;

/// A client request to the monitor socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// The container runtime announces a lifecycle transition.
    Publish {
        /// Container that transitioned.
        name: ContainerName,
        /// The new state.
        state: ContainerState,
    },
    /// Query the current state of a container.
    Status {
        /// Container to query.
        name: ContainerName,
    },
    /// Block until the container reaches one of the target states.
    Wait {
        /// Container to wait on.
        name: ContainerName,
        /// Target states to match.
        states: StateSet,
        /// Seconds to wait; negative means forever, zero means poll.
        timeout_secs: i64,
    },
}

/// The monitor's reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Response {
    /// A publish was recorded.
    Ack,
    /// The container's current record.
    State {
        /// Latest registry record.
        record: StateRecord,
    },
    /// The container has never published.
    Unknown,
    /// Terminal outcome of a wait.
    Outcome {
        /// The wait's result.
        outcome: WaitOutcome,
    },
    /// The request could not be served.
    Error {
        /// Classification of the failure.
        kind: ErrorKind,
        /// Description of the failure.
        message: String,
    },
}

/// Classification of a server-side failure, carried on the wire so the
/// client can surface the matching error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request was malformed (e.g. an empty target state set).
    InvalidArgument,
    /// The monitor could not allocate resources for the wait.
    ResourceExhausted,
    /// Any other server-side failure.
    Internal,
}

impl From<&StatewatchError> for ErrorKind {
    fn from(error: &StatewatchError) -> Self {
        match error {
            StatewatchError::InvalidArgument { .. } => Self::InvalidArgument,
            StatewatchError::ResourceExhausted { .. } => Self::ResourceExhausted,
            _ => Self::Internal,
        }
    }
}

/// Writes one frame followed by a newline and flushes.
///
/// # Errors
///
/// Returns an error if serialization or the socket write fails.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, frame: &T) -> Result<()> {
    let mut line = serde_json::to_vec(frame)?;
    line.push(b'\n');
    writer
        .write_all(&line)
        .and_then(|()| writer.flush())
        .map_err(|source| StatewatchError::Io {
            path: "<monitor socket>".into(),
            source,
        })
}

/// Reads one frame, returning `None` on a clean EOF.
///
/// # Errors
///
/// Returns an error if the socket read fails or the line is not a
/// valid frame.
pub fn read_frame<R: BufRead, T: DeserializeOwned>(reader: &mut R) -> Result<Option<T>> {
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|source| StatewatchError::Io {
            path: "<monitor socket>".into(),
            source,
        })?;
    if read == 0 {
        return Ok(None);
    }
    if line.trim().is_empty() {
        return Err(StatewatchError::Protocol {
            message: "empty frame".to_owned(),
        });
    }
    Ok(Some(serde_json::from_str(&line)?))
}
