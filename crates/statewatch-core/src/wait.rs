//! Blocking wait for a container to reach one of a set of states.

use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use statewatch_common::error::{Result, StatewatchError};
use statewatch_common::types::{ContainerName, ContainerState, StateSet};

use crate::cancel::CancelToken;
use crate::monitor::{Delivery, StateMonitor, Subscription};

/// Terminal outcome of a [`wait`] call.
///
/// `TimedOut` and `Cancelled` are expected results, not errors; callers
/// that need to distinguish a deliberate abort from an expired deadline
/// get two separate variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WaitOutcome {
    /// The container reached one of the target states.
    Matched {
        /// The first target state observed.
        state: ContainerState,
    },
    /// The timeout elapsed before any target state was observed.
    TimedOut,
    /// The wait was aborted by its cancellation token.
    Cancelled,
}

impl std::fmt::Display for WaitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched { state } => write!(f, "matched {state}"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// How long a [`wait`] call may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTimeout {
    /// Block until a match or cancellation; never time out.
    Forever,
    /// Check the current state only; never block.
    Poll,
    /// Block for at most this long.
    After(Duration),
}

impl WaitTimeout {
    /// Maps the CLI's signed-seconds convention: negative waits
    /// forever, zero checks the current state without blocking.
    #[must_use]
    pub fn from_secs(secs: i64) -> Self {
        match secs {
            s if s < 0 => Self::Forever,
            0 => Self::Poll,
            s => Self::After(Duration::from_secs(s.unsigned_abs())),
        }
    }
}

/// Blocks until `name` reaches one of `targets`, the timeout elapses,
/// or `cancel` is tripped.
///
/// A container that has never published is not an error: the wait
/// proceeds and matches the first qualifying transition, if any.
/// Intermediate non-target transitions are skipped, and when several
/// target states are published the first one observed wins. The
/// subscription opened for the blocking phase is released on every exit
/// path.
///
/// # Errors
///
/// Returns [`StatewatchError::InvalidArgument`] if `targets` is empty,
/// or [`StatewatchError::ResourceExhausted`] if the monitoring domain
/// is torn down while the wait is blocked.
pub fn wait(
    monitor: &StateMonitor,
    name: &ContainerName,
    targets: StateSet,
    timeout: WaitTimeout,
    cancel: &CancelToken,
) -> Result<WaitOutcome> {
    if targets.is_empty() {
        return Err(StatewatchError::InvalidArgument {
            message: "empty target state set".to_owned(),
        });
    }
    if cancel.is_cancelled() {
        return Ok(WaitOutcome::Cancelled);
    }

    // Fast path: the current state may already satisfy the request, in
    // which case no subscription is ever opened.
    let initial = monitor.current(name);
    if let Some(record) = &initial
        && targets.matches(record.state)
    {
        tracing::debug!(container = %name, state = %record.state, "matched on fast path");
        return Ok(WaitOutcome::Matched {
            state: record.state,
        });
    }
    if timeout == WaitTimeout::Poll {
        return Ok(WaitOutcome::TimedOut);
    }

    // Subscribe and re-check in the same critical section as the
    // fan-out, so a transition landing between the query above and the
    // registration cannot be lost.
    let (subscription, snapshot) = monitor.subscribe(name);
    let _hook = cancel.hook(subscription.waker());
    if let Some(record) = snapshot {
        let moved = initial.is_none_or(|r| r.generation != record.generation);
        if moved && targets.matches(record.state) {
            tracing::debug!(
                container = %name,
                state = %record.state,
                "matched transition raced with subscription"
            );
            return Ok(WaitOutcome::Matched {
                state: record.state,
            });
        }
    }

    let deadline = match timeout {
        WaitTimeout::After(duration) => Some(Instant::now() + duration),
        WaitTimeout::Forever | WaitTimeout::Poll => None,
    };
    block_on_subscription(name, &subscription, targets, deadline)
}

/// The blocking phase: filters deliveries against the target set until
/// a match, the deadline, or an interrupt.
fn block_on_subscription(
    name: &ContainerName,
    subscription: &Subscription,
    targets: StateSet,
    deadline: Option<Instant>,
) -> Result<WaitOutcome> {
    loop {
        let delivery = match deadline {
            None => subscription.recv().map_err(|_| domain_gone())?,
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    // A delivery that arrived right at the deadline is
                    // still honored; only an empty channel times out.
                    match subscription.try_recv() {
                        Ok(delivery) => delivery,
                        Err(TryRecvError::Empty) => {
                            tracing::debug!(container = %name, %targets, "wait timed out");
                            return Ok(WaitOutcome::TimedOut);
                        }
                        Err(TryRecvError::Disconnected) => return Err(domain_gone()),
                    }
                } else {
                    match subscription.recv_timeout(remaining) {
                        Ok(delivery) => delivery,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => return Err(domain_gone()),
                    }
                }
            }
        };

        match delivery {
            Delivery::Transition(state) if targets.matches(state) => {
                tracing::debug!(container = %name, %state, "wait matched");
                return Ok(WaitOutcome::Matched { state });
            }
            Delivery::Transition(state) => {
                // Intermediate non-target state; keep waiting.
                tracing::trace!(container = %name, %state, "skipping non-target transition");
            }
            Delivery::Interrupted => {
                tracing::debug!(container = %name, "wait cancelled");
                return Ok(WaitOutcome::Cancelled);
            }
        }
    }
}

fn domain_gone() -> StatewatchError {
    StatewatchError::ResourceExhausted {
        message: "monitoring domain shut down during wait".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn timeout_from_negative_secs_is_forever() {
        assert_eq!(WaitTimeout::from_secs(-1), WaitTimeout::Forever);
    }

    #[test]
    fn timeout_from_zero_secs_is_poll() {
        assert_eq!(WaitTimeout::from_secs(0), WaitTimeout::Poll);
    }

    #[test]
    fn timeout_from_positive_secs_is_bounded() {
        assert_eq!(
            WaitTimeout::from_secs(5),
            WaitTimeout::After(Duration::from_secs(5))
        );
    }

    #[test]
    fn empty_target_set_is_rejected() {
        let monitor = StateMonitor::new();
        let result = wait(
            &monitor,
            &ContainerName::new("c1"),
            StateSet::empty(),
            WaitTimeout::Poll,
            &CancelToken::new(),
        );
        assert!(matches!(
            result,
            Err(StatewatchError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn outcome_serde_roundtrip() {
        let outcome = WaitOutcome::Matched {
            state: ContainerState::Running,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        let back: WaitOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
    }
}
