//! Transition fan-out to subscribers.
//!
//! Every published transition is delivered, in publish order, to each
//! subscription registered for the container at publish time. Each
//! subscriber owns its own unbounded delivery channel, so a slow waiter
//! never blocks the publisher or its peers.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use statewatch_common::types::{ContainerName, ContainerState};
use uuid::Uuid;

use crate::registry::{StateRecord, StateRegistry};

/// A message on a subscription's delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// The container transitioned to a new state.
    Transition(ContainerState),
    /// The owning wait was cancelled; wake up and exit.
    Interrupted,
}

#[derive(Debug)]
struct SubscriberSlot {
    id: Uuid,
    tx: Sender<Delivery>,
}

#[derive(Debug)]
struct MonitorShared {
    registry: StateRegistry,
    topics: Mutex<HashMap<ContainerName, Vec<SubscriberSlot>>>,
}

impl MonitorShared {
    fn remove_slot(&self, name: &ContainerName, id: Uuid) {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slots) = topics.get_mut(name) {
            slots.retain(|slot| slot.id != id);
            if slots.is_empty() {
                let _ = topics.remove(name);
            }
        }
    }
}

/// Fan-out hub for one monitoring domain.
///
/// Cloning is cheap and shares the underlying registry and subscriber
/// table; construct one per domain at startup and hand clones to every
/// publisher and waiter.
#[derive(Debug, Clone)]
pub struct StateMonitor {
    shared: Arc<MonitorShared>,
}

impl StateMonitor {
    /// Creates a monitor with an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(MonitorShared {
                registry: StateRegistry::new(),
                topics: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Publishes a transition: records it in the registry, then delivers
    /// it to every live subscription for `name`.
    ///
    /// Fire-and-forget from the publisher's perspective; a subscriber
    /// that disappeared mid-delivery is pruned without affecting the
    /// others. Delivery happens under the topic lock, which is what
    /// keeps it ordered and race-free with respect to [`subscribe`].
    ///
    /// [`subscribe`]: Self::subscribe
    pub fn publish(&self, name: &ContainerName, state: ContainerState) {
        let generation = self.shared.registry.record(name, state);
        tracing::debug!(container = %name, %state, generation, "transition published");

        let mut topics = self
            .shared
            .topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(slots) = topics.get_mut(name) {
            slots.retain(|slot| slot.tx.send(Delivery::Transition(state)).is_ok());
            if slots.is_empty() {
                let _ = topics.remove(name);
            }
        }
    }

    /// Returns the latest known record for `name`.
    #[must_use]
    pub fn current(&self, name: &ContainerName) -> Option<StateRecord> {
        self.shared.registry.current(name)
    }

    /// Opens a subscription for `name` and snapshots the registry record
    /// in the same critical section.
    ///
    /// The snapshot closes the subscribe/publish race: a publish that
    /// finished its registry write before this call locked the topic
    /// table is visible in the returned record, and any later publish
    /// delivers through the already-registered channel. Never blocks;
    /// there is no limit on concurrent subscriptions per name.
    #[must_use]
    pub fn subscribe(&self, name: &ContainerName) -> (Subscription, Option<StateRecord>) {
        let (tx, rx) = mpsc::channel();
        let id = Uuid::new_v4();

        let mut topics = self
            .shared
            .topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        topics
            .entry(name.clone())
            .or_default()
            .push(SubscriberSlot { id, tx: tx.clone() });
        let snapshot = self.shared.registry.current(name);
        drop(topics);

        tracing::debug!(container = %name, subscription = %id, "subscribed");
        let subscription = Subscription {
            shared: Arc::clone(&self.shared),
            name: name.clone(),
            id,
            tx,
            rx,
        };
        (subscription, snapshot)
    }

    /// Number of live subscriptions for `name`.
    #[must_use]
    pub fn subscriber_count(&self, name: &ContainerName) -> usize {
        self.shared
            .topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map_or(0, Vec::len)
    }
}

impl Default for StateMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// A live registration for one container's future transitions.
///
/// Owned by the wait call that created it; the monitor only holds an
/// entry in its fan-out list, which is removed by [`unsubscribe`] or on
/// drop, so a subscription can never outlive its waiter regardless of
/// the exit path taken.
///
/// [`unsubscribe`]: Self::unsubscribe
#[derive(Debug)]
pub struct Subscription {
    shared: Arc<MonitorShared>,
    name: ContainerName,
    id: Uuid,
    tx: Sender<Delivery>,
    rx: Receiver<Delivery>,
}

impl Subscription {
    /// Removes this subscription from the fan-out list. Idempotent;
    /// calling it after the entry is already gone is a no-op.
    pub fn unsubscribe(&self) {
        self.shared.remove_slot(&self.name, self.id);
    }

    /// A sender that injects directly into this subscription's delivery
    /// channel, used by cancellation to wake a blocked waiter.
    pub(crate) fn waker(&self) -> Sender<Delivery> {
        self.tx.clone()
    }

    /// Blocks until the next delivery.
    pub(crate) fn recv(&self) -> Result<Delivery, mpsc::RecvError> {
        self.rx.recv()
    }

    /// Blocks until the next delivery or `timeout` elapses.
    pub(crate) fn recv_timeout(&self, timeout: Duration) -> Result<Delivery, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Returns a pending delivery without blocking.
    pub(crate) fn try_recv(&self) -> Result<Delivery, TryRecvError> {
        self.rx.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
        tracing::debug!(container = %self.name, subscription = %self.id, "unsubscribed");
    }
}
