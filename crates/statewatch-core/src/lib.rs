//! # statewatch-core
//!
//! The container state monitor: a registry of current container states,
//! a fan-out of published transitions to any number of subscribers, and
//! the blocking [`wait`] operation built on top of them.
//!
//! The container runtime calls [`StateMonitor::publish`] on every
//! lifecycle transition; waiters call [`wait`] with a target
//! [`StateSet`](statewatch_common::types::StateSet) and an optional
//! timeout. The [`ipc`] module carries both operations across process
//! boundaries over a local Unix socket.
//!
//! # Example
//!
//! ```rust
//! use statewatch_core::{CancelToken, StateMonitor, WaitOutcome, WaitTimeout, wait};
//! use statewatch_common::types::{ContainerName, ContainerState, StateSet};
//!
//! let monitor = StateMonitor::new();
//! let name = ContainerName::new("web");
//! monitor.publish(&name, ContainerState::Running);
//!
//! let outcome = wait(
//!     &monitor,
//!     &name,
//!     StateSet::RUNNING,
//!     WaitTimeout::Poll,
//!     &CancelToken::new(),
//! ).unwrap();
//! assert_eq!(outcome, WaitOutcome::Matched { state: ContainerState::Running });
//! ```

pub mod cancel;
pub mod ipc;
pub mod monitor;
pub mod registry;
pub mod wait;

pub use cancel::CancelToken;
pub use monitor::{StateMonitor, Subscription};
pub use registry::{StateRecord, StateRegistry};
pub use wait::{WaitOutcome, WaitTimeout, wait};
