//! Cross-process transport for the monitor.
//!
//! One process hosts the monitoring domain behind a Unix stream socket
//! ([`MonitorServer`]); container runtimes and waiters in other
//! processes talk to it through [`MonitorClient`]. Each connection
//! carries a single request. A waiter that dies mid-wait is detected
//! through connection EOF and its server-side subscription is released
//! via cancellation, so remote waits obey the same scoped-resource
//! discipline as in-process ones.

pub mod protocol;

use std::io::BufReader;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use statewatch_common::error::{Result, StatewatchError};
use statewatch_common::types::{ContainerName, ContainerState, StateSet};

use crate::cancel::CancelToken;
use crate::monitor::StateMonitor;
use crate::registry::StateRecord;
use crate::wait::{WaitOutcome, WaitTimeout, wait};
use protocol::{Request, Response, read_frame, write_frame};

/// How often a client polls its cancellation token while blocked on a
/// remote wait.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Serves one monitoring domain over a Unix socket.
pub struct MonitorServer {
    listener: UnixListener,
    monitor: StateMonitor,
    path: PathBuf,
}

impl MonitorServer {
    /// Binds the monitor socket, replacing a stale socket file from a
    /// previous run.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn bind(path: &Path, monitor: StateMonitor) -> Result<Self> {
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
        let listener = UnixListener::bind(path).map_err(|source| StatewatchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(socket = %path.display(), "monitor socket bound");
        Ok(Self {
            listener,
            monitor,
            path: path.to_path_buf(),
        })
    }

    /// Returns the bound socket path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accepts connections until the listener fails, serving each on
    /// its own thread.
    pub fn serve(self) {
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let monitor = self.monitor.clone();
                    let _ = std::thread::spawn(move || {
                        if let Err(error) = handle_connection(&monitor, stream) {
                            tracing::warn!(%error, "monitor connection failed");
                        }
                    });
                }
                Err(error) => {
                    tracing::warn!(%error, "accept failed");
                }
            }
        }
    }

    /// Moves the accept loop onto a background thread.
    pub fn spawn(self) -> std::thread::JoinHandle<()> {
        std::thread::spawn(move || self.serve())
    }
}

impl std::fmt::Debug for MonitorServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorServer")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn handle_connection(monitor: &StateMonitor, stream: UnixStream) -> Result<()> {
    let read_half = stream.try_clone().map_err(|source| StatewatchError::Io {
        path: "<monitor socket>".into(),
        source,
    })?;
    let mut reader = BufReader::new(read_half);
    let mut writer = stream;

    let Some(request) = read_frame::<_, Request>(&mut reader)? else {
        return Ok(());
    };

    match request {
        Request::Publish { name, state } => {
            monitor.publish(&name, state);
            write_frame(&mut writer, &Response::Ack)
        }
        Request::Status { name } => {
            let response = monitor
                .current(&name)
                .map_or(Response::Unknown, |record| Response::State { record });
            write_frame(&mut writer, &response)
        }
        Request::Wait {
            name,
            states,
            timeout_secs,
        } => {
            let token = CancelToken::new();

            // Watch for the client hanging up while we block, so a dead
            // waiter releases its subscription instead of leaking it.
            let hangup_token = token.clone();
            let _ = std::thread::spawn(move || {
                while let Ok(Some(_)) = read_frame::<_, Request>(&mut reader) {
                    // Extra frames on a wait connection are ignored.
                }
                hangup_token.cancel();
            });

            let timeout = WaitTimeout::from_secs(timeout_secs);
            let response = match wait(monitor, &name, states, timeout, &token) {
                Ok(outcome) => Response::Outcome { outcome },
                Err(error) => Response::Error {
                    kind: protocol::ErrorKind::from(&error),
                    message: error.to_string(),
                },
            };
            // The client may already be gone; nothing left to clean up.
            let _ = write_frame(&mut writer, &response);
            Ok(())
        }
    }
}

/// Client side of the monitor socket.
#[derive(Debug, Clone)]
pub struct MonitorClient {
    socket_path: PathBuf,
}

impl MonitorClient {
    /// Creates a client for the given socket path.
    #[must_use]
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    fn connect(&self) -> Result<UnixStream> {
        UnixStream::connect(&self.socket_path).map_err(|source| StatewatchError::Io {
            path: self.socket_path.clone(),
            source,
        })
    }

    fn roundtrip(&self, request: &Request) -> Result<Response> {
        let stream = self.connect()?;
        let mut writer = stream.try_clone().map_err(|source| StatewatchError::Io {
            path: self.socket_path.clone(),
            source,
        })?;
        write_frame(&mut writer, request)?;
        let mut reader = BufReader::new(stream);
        read_frame(&mut reader)?.ok_or_else(|| StatewatchError::Protocol {
            message: "monitor closed the connection without replying".to_owned(),
        })
    }

    /// Announces a lifecycle transition. Fire-and-forget beyond the
    /// monitor's acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor is unreachable or replies with
    /// anything but an acknowledgement.
    pub fn publish(&self, name: &ContainerName, state: ContainerState) -> Result<()> {
        match self.roundtrip(&Request::Publish {
            name: name.clone(),
            state,
        })? {
            Response::Ack => Ok(()),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Queries the current state of a container. `None` means the
    /// container has never published.
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor is unreachable or replies out of
    /// protocol.
    pub fn status(&self, name: &ContainerName) -> Result<Option<StateRecord>> {
        match self.roundtrip(&Request::Status { name: name.clone() })? {
            Response::State { record } => Ok(Some(record)),
            Response::Unknown => Ok(None),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Blocks until the monitor reports an outcome for the wait, or
    /// `cancel` is tripped, in which case the connection is torn down
    /// and the outcome is [`WaitOutcome::Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor is unreachable, reports an
    /// invalid request, or replies out of protocol.
    pub fn wait(
        &self,
        name: &ContainerName,
        states: StateSet,
        timeout_secs: i64,
        cancel: &CancelToken,
    ) -> Result<WaitOutcome> {
        let stream = self.connect()?;
        let mut writer = stream.try_clone().map_err(|source| StatewatchError::Io {
            path: self.socket_path.clone(),
            source,
        })?;
        write_frame(
            &mut writer,
            &Request::Wait {
                name: name.clone(),
                states,
                timeout_secs,
            },
        )?;

        // Poll the token while blocked on the reply; tripping it closes
        // the socket, which the server turns into a cancelled wait.
        let done = Arc::new(AtomicBool::new(false));
        if let Ok(watched) = stream.try_clone() {
            let done = Arc::clone(&done);
            let cancel = cancel.clone();
            let _ = std::thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    if cancel.is_cancelled() {
                        let _ = watched.shutdown(std::net::Shutdown::Both);
                        break;
                    }
                    std::thread::sleep(CANCEL_POLL_INTERVAL);
                }
            });
        }

        let mut reader = BufReader::new(stream);
        let reply = read_frame::<_, Response>(&mut reader);
        done.store(true, Ordering::SeqCst);

        match reply {
            Ok(Some(Response::Outcome { outcome })) => Ok(outcome),
            Ok(Some(Response::Error { kind, message })) => Err(remote_error(kind, message)),
            Ok(Some(other)) => Err(unexpected_reply(&other)),
            Ok(None) | Err(_) if cancel.is_cancelled() => Ok(WaitOutcome::Cancelled),
            Ok(None) => Err(StatewatchError::Protocol {
                message: "monitor closed the connection without replying".to_owned(),
            }),
            Err(error) => Err(error),
        }
    }
}

/// Rebuilds a server-side failure from its wire classification.
fn remote_error(kind: protocol::ErrorKind, message: String) -> StatewatchError {
    match kind {
        protocol::ErrorKind::InvalidArgument => StatewatchError::InvalidArgument { message },
        protocol::ErrorKind::ResourceExhausted => StatewatchError::ResourceExhausted { message },
        protocol::ErrorKind::Internal => StatewatchError::Protocol { message },
    }
}

fn unexpected_reply(response: &Response) -> StatewatchError {
    StatewatchError::Protocol {
        message: format!("unexpected reply: {response:?}"),
    }
}
