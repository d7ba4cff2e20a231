//! Cooperative cancellation for blocking waits.
//!
//! A [`CancelToken`] is shared between the code that may abort a wait
//! (a Ctrl-C handler, a dropped IPC connection) and the wait itself.
//! Cancelling both sets a flag and injects a wake-up into every hooked
//! delivery channel, so a waiter blocked on its subscription returns
//! promptly instead of sleeping out its timeout.
//!
//! A token outlives the waits it guards: hooking returns a guard that
//! detaches the waker when the wait ends, so a long-lived token reused
//! across many waits never accumulates dead channels.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use crate::monitor::Delivery;

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    wakers: Mutex<Vec<(Uuid, Sender<Delivery>)>>,
}

/// Shared cancellation token.
///
/// Clones share state; cancelling any clone cancels them all. A token
/// is one-shot: once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Cancels the token and wakes every hooked waiter.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let mut wakers = self
            .inner
            .wakers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for (_, waker) in wakers.drain(..) {
            // The waiter may already be gone; that is fine.
            let _ = waker.send(Delivery::Interrupted);
        }
    }

    /// Number of waiters currently hooked to this token.
    #[must_use]
    pub fn waker_count(&self) -> usize {
        self.inner
            .wakers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Registers a delivery channel to be woken on cancellation. If the
    /// token is already cancelled the wake-up is sent immediately, so a
    /// hook can never miss a cancellation. Dropping the returned guard
    /// detaches the channel again.
    #[must_use]
    pub(crate) fn hook(&self, waker: Sender<Delivery>) -> CancelHook {
        let id = Uuid::new_v4();
        let mut wakers = self
            .inner
            .wakers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.inner.cancelled.load(Ordering::SeqCst) {
            let _ = waker.send(Delivery::Interrupted);
        } else {
            wakers.push((id, waker));
        }
        drop(wakers);
        CancelHook {
            inner: Arc::clone(&self.inner),
            id,
        }
    }
}

/// Scoped registration of one waker on a [`CancelToken`].
///
/// Held by a wait for its blocking phase; dropping it removes the waker
/// from the token on every exit path, mirroring how a
/// [`Subscription`](crate::monitor::Subscription) drop-unsubscribes.
#[derive(Debug)]
pub(crate) struct CancelHook {
    inner: Arc<CancelInner>,
    id: Uuid,
}

impl Drop for CancelHook {
    fn drop(&mut self) {
        let mut wakers = self
            .inner
            .wakers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        wakers.retain(|(id, _)| *id != self.id);
    }
}
