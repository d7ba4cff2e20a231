//! Current-state registry.
//!
//! Holds the latest known state of each container by name, together with
//! a per-name generation counter used to detect transitions between two
//! observation points.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use statewatch_common::types::{ContainerName, ContainerState};

/// The latest known state of one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Current lifecycle state.
    pub state: ContainerState,
    /// Monotonically increasing counter, bumped on every transition.
    pub generation: u64,
    /// ISO-8601 timestamp of the last transition.
    pub changed_at: String,
}

/// Registry of current container states for one monitoring domain.
///
/// Safe under concurrent publishes to different names; publishes to the
/// same name are serialized by the publisher, which owns its container's
/// transitions.
#[derive(Debug, Default)]
pub struct StateRegistry {
    records: RwLock<HashMap<ContainerName, StateRecord>>,
}

impl StateRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `state` as current for `name` and returns the new
    /// generation. The first publish for a name creates its record.
    pub fn record(&self, name: &ContainerName, state: ContainerState) -> u64 {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = records
            .entry(name.clone())
            .and_modify(|record| {
                record.state = state;
                record.generation += 1;
                record.changed_at = chrono::Utc::now().to_rfc3339();
            })
            .or_insert_with(|| StateRecord {
                state,
                generation: 1,
                changed_at: chrono::Utc::now().to_rfc3339(),
            });
        entry.generation
    }

    /// Returns the latest known record for `name`, or `None` if the
    /// container has never published. `None` is a legitimate observable
    /// condition (not yet started, or unknown name), never an error.
    #[must_use]
    pub fn current(&self, name: &ContainerName) -> Option<StateRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn current_is_none_before_first_publish() {
        let registry = StateRegistry::new();
        assert!(registry.current(&ContainerName::new("c1")).is_none());
    }

    #[test]
    fn first_publish_creates_record_at_generation_one() {
        let registry = StateRegistry::new();
        let name = ContainerName::new("c1");
        assert_eq!(registry.record(&name, ContainerState::Starting), 1);

        let record = registry.current(&name).unwrap();
        assert_eq!(record.state, ContainerState::Starting);
        assert_eq!(record.generation, 1);
    }

    #[test]
    fn generation_increases_on_every_transition() {
        let registry = StateRegistry::new();
        let name = ContainerName::new("c1");
        let _ = registry.record(&name, ContainerState::Starting);
        let _ = registry.record(&name, ContainerState::Running);
        let generation = registry.record(&name, ContainerState::Stopping);
        assert_eq!(generation, 3);
        assert_eq!(
            registry.current(&name).unwrap().state,
            ContainerState::Stopping
        );
    }

    #[test]
    fn names_are_tracked_independently() {
        let registry = StateRegistry::new();
        let _ = registry.record(&ContainerName::new("a"), ContainerState::Running);
        let _ = registry.record(&ContainerName::new("b"), ContainerState::Stopped);

        assert_eq!(
            registry.current(&ContainerName::new("a")).unwrap().state,
            ContainerState::Running
        );
        assert_eq!(
            registry.current(&ContainerName::new("b")).unwrap().state,
            ContainerState::Stopped
        );
    }
}
