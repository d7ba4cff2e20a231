//! Domain primitive types used across the statewatch workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StatewatchError;

/// Name of a monitored container, unique within one monitoring domain.
///
/// The name is opaque to the monitor; container lifecycles are owned by
/// the runtime that publishes their transitions, never by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerName(String);

impl ContainerName {
    /// Creates a container name from a string value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContainerName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Lifecycle state of a container.
///
/// The alphabet is closed: a container is in exactly one of these states
/// at any instant. Wire and CLI representation is the upper-case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContainerState {
    /// Container is not running.
    Stopped,
    /// Container is being started.
    Starting,
    /// Container is actively running.
    Running,
    /// Container is shutting down gracefully.
    Stopping,
    /// Container is being torn down after a failure.
    Aborting,
    /// Container is being frozen.
    Freezing,
    /// Container is frozen.
    Frozen,
}

impl ContainerState {
    /// All states, in wire order.
    pub const ALL: [Self; 7] = [
        Self::Stopped,
        Self::Starting,
        Self::Running,
        Self::Stopping,
        Self::Aborting,
        Self::Freezing,
        Self::Frozen,
    ];

    /// Returns the upper-case wire name of this state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "STOPPED",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Aborting => "ABORTING",
            Self::Freezing => "FREEZING",
            Self::Frozen => "FROZEN",
        }
    }

    /// Returns the singleton [`StateSet`] containing only this state.
    #[must_use]
    pub const fn as_set(self) -> StateSet {
        match self {
            Self::Stopped => StateSet::STOPPED,
            Self::Starting => StateSet::STARTING,
            Self::Running => StateSet::RUNNING,
            Self::Stopping => StateSet::STOPPING,
            Self::Aborting => StateSet::ABORTING,
            Self::Freezing => StateSet::FREEZING,
            Self::Frozen => StateSet::FROZEN,
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerState {
    type Err = StatewatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STOPPED" => Ok(Self::Stopped),
            "STARTING" => Ok(Self::Starting),
            "RUNNING" => Ok(Self::Running),
            "STOPPING" => Ok(Self::Stopping),
            "ABORTING" => Ok(Self::Aborting),
            "FREEZING" => Ok(Self::Freezing),
            "FROZEN" => Ok(Self::Frozen),
            other => Err(StatewatchError::InvalidArgument {
                message: format!("unknown container state: {other}"),
            }),
        }
    }
}

bitflags::bitflags! {
    /// A set of container states, used as a wait target ("any of").
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct StateSet: u8 {
        /// Container is not running.
        const STOPPED = 1 << 0;
        /// Container is being started.
        const STARTING = 1 << 1;
        /// Container is actively running.
        const RUNNING = 1 << 2;
        /// Container is shutting down gracefully.
        const STOPPING = 1 << 3;
        /// Container is being torn down after a failure.
        const ABORTING = 1 << 4;
        /// Container is being frozen.
        const FREEZING = 1 << 5;
        /// Container is frozen.
        const FROZEN = 1 << 6;
    }
}

impl StateSet {
    /// Parses an ORed state list such as `RUNNING|STOPPED` or
    /// `running,stopped`. State names are case-insensitive; both `|`
    /// and `,` separate entries.
    ///
    /// # Errors
    ///
    /// Returns [`StatewatchError::InvalidArgument`] if the list is empty
    /// or contains an unknown state name.
    pub fn parse(list: &str) -> crate::error::Result<Self> {
        let mut set = Self::empty();
        for part in list.split(['|', ',']) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            set |= part.parse::<ContainerState>()?.as_set();
        }
        if set.is_empty() {
            return Err(StatewatchError::InvalidArgument {
                message: format!("no target states in {list:?}"),
            });
        }
        Ok(set)
    }

    /// Returns whether `state` is a member of this set.
    #[must_use]
    pub const fn matches(self, state: ContainerState) -> bool {
        self.contains(state.as_set())
    }
}

impl fmt::Display for StateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for state in ContainerState::ALL {
            if self.matches(state) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(state.as_str())?;
                first = false;
            }
        }
        Ok(())
    }
}

impl From<ContainerState> for StateSet {
    fn from(state: ContainerState) -> Self {
        state.as_set()
    }
}
