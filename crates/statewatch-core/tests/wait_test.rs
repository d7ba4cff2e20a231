//! Behavioral tests for the state monitor and wait operation.
//!
//! Covers the observable contract end to end: fast-path matches,
//! first-match selection, timeouts, unbounded waits with cancellation,
//! concurrent fan-out, subscription hygiene under churn, and the
//! subscribe/publish race.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::{Duration, Instant};

use statewatch_common::types::{ContainerName, ContainerState, StateSet};
use statewatch_core::{CancelToken, StateMonitor, WaitOutcome, WaitTimeout, wait};

fn name(s: &str) -> ContainerName {
    ContainerName::new(s)
}

fn matched(state: ContainerState) -> WaitOutcome {
    WaitOutcome::Matched { state }
}

// ── Fast path ────────────────────────────────────────────────────────

#[test]
fn current_state_matches_without_blocking() {
    let monitor = StateMonitor::new();
    monitor.publish(&name("c1"), ContainerState::Running);

    let started = Instant::now();
    let outcome = wait(
        &monitor,
        &name("c1"),
        StateSet::RUNNING | StateSet::STOPPED,
        WaitTimeout::After(Duration::from_secs(30)),
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(outcome, matched(ContainerState::Running));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(monitor.subscriber_count(&name("c1")), 0);
}

#[test]
fn poll_timeout_never_blocks() {
    let monitor = StateMonitor::new();
    monitor.publish(&name("c1"), ContainerState::Stopped);

    let hit = wait(
        &monitor,
        &name("c1"),
        StateSet::STOPPED,
        WaitTimeout::Poll,
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(hit, matched(ContainerState::Stopped));

    let miss = wait(
        &monitor,
        &name("c1"),
        StateSet::RUNNING,
        WaitTimeout::Poll,
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(miss, WaitOutcome::TimedOut);
}

// ── Transition matching ──────────────────────────────────────────────

#[test]
fn first_matching_transition_wins() {
    let monitor = StateMonitor::new();
    monitor.publish(&name("c1"), ContainerState::Starting);

    let waiter = {
        let monitor = monitor.clone();
        std::thread::spawn(move || {
            wait(
                &monitor,
                &name("c1"),
                StateSet::STOPPING | StateSet::STOPPED,
                WaitTimeout::After(Duration::from_secs(10)),
                &CancelToken::new(),
            )
        })
    };

    // Let the waiter reach its blocking phase.
    while monitor.subscriber_count(&name("c1")) == 0 {
        std::thread::sleep(Duration::from_millis(5));
    }
    monitor.publish(&name("c1"), ContainerState::Running);
    monitor.publish(&name("c1"), ContainerState::Stopping);
    monitor.publish(&name("c1"), ContainerState::Stopped);

    let outcome = waiter.join().unwrap().unwrap();
    assert_eq!(outcome, matched(ContainerState::Stopping));
}

#[test]
fn intermediate_states_do_not_end_the_wait() {
    let monitor = StateMonitor::new();

    let waiter = {
        let monitor = monitor.clone();
        std::thread::spawn(move || {
            wait(
                &monitor,
                &name("c1"),
                StateSet::RUNNING,
                WaitTimeout::After(Duration::from_secs(10)),
                &CancelToken::new(),
            )
        })
    };

    while monitor.subscriber_count(&name("c1")) == 0 {
        std::thread::sleep(Duration::from_millis(5));
    }
    monitor.publish(&name("c1"), ContainerState::Starting);
    monitor.publish(&name("c1"), ContainerState::Freezing);
    monitor.publish(&name("c1"), ContainerState::Running);

    assert_eq!(
        waiter.join().unwrap().unwrap(),
        matched(ContainerState::Running)
    );
}

// ── Timeouts ─────────────────────────────────────────────────────────

#[test]
fn times_out_when_no_target_state_arrives() {
    let monitor = StateMonitor::new();
    monitor.publish(&name("c1"), ContainerState::Stopped);

    let started = Instant::now();
    let outcome = wait(
        &monitor,
        &name("c1"),
        StateSet::RUNNING,
        WaitTimeout::After(Duration::from_millis(200)),
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(outcome, WaitOutcome::TimedOut);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_secs(3));
    assert_eq!(monitor.subscriber_count(&name("c1")), 0);
}

#[test]
fn unknown_container_times_out_instead_of_failing() {
    let monitor = StateMonitor::new();
    let outcome = wait(
        &monitor,
        &name("never-seen"),
        StateSet::STOPPED,
        WaitTimeout::After(Duration::from_millis(100)),
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(outcome, WaitOutcome::TimedOut);
}

#[test]
fn timeout_then_fast_path_after_transitions() {
    let monitor = StateMonitor::new();
    monitor.publish(&name("c1"), ContainerState::Stopped);

    let first = wait(
        &monitor,
        &name("c1"),
        StateSet::RUNNING,
        WaitTimeout::After(Duration::from_millis(150)),
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(first, WaitOutcome::TimedOut);

    monitor.publish(&name("c1"), ContainerState::Starting);
    monitor.publish(&name("c1"), ContainerState::Running);

    let started = Instant::now();
    let second = wait(
        &monitor,
        &name("c1"),
        StateSet::RUNNING,
        WaitTimeout::After(Duration::from_secs(2)),
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(second, matched(ContainerState::Running));
    assert!(started.elapsed() < Duration::from_millis(500));
}

// ── Cancellation ─────────────────────────────────────────────────────

#[test]
fn forever_wait_ends_on_cancellation_not_timeout() {
    let monitor = StateMonitor::new();
    let token = CancelToken::new();

    let waiter = {
        let monitor = monitor.clone();
        let token = token.clone();
        std::thread::spawn(move || {
            wait(
                &monitor,
                &name("c1"),
                StateSet::RUNNING,
                WaitTimeout::Forever,
                &token,
            )
        })
    };

    while monitor.subscriber_count(&name("c1")) == 0 {
        std::thread::sleep(Duration::from_millis(5));
    }
    token.cancel();

    let outcome = waiter.join().unwrap().unwrap();
    assert_eq!(outcome, WaitOutcome::Cancelled);
    assert_eq!(monitor.subscriber_count(&name("c1")), 0);
}

#[test]
fn already_cancelled_token_short_circuits() {
    let monitor = StateMonitor::new();
    let token = CancelToken::new();
    token.cancel();

    let outcome = wait(
        &monitor,
        &name("c1"),
        StateSet::RUNNING,
        WaitTimeout::Forever,
        &token,
    )
    .unwrap();
    assert_eq!(outcome, WaitOutcome::Cancelled);
}

// ── Concurrency ──────────────────────────────────────────────────────

#[test]
fn concurrent_waiters_both_observe_one_publish() {
    let monitor = StateMonitor::new();
    monitor.publish(&name("c1"), ContainerState::Stopped);

    let spawn_waiter = |targets: StateSet| {
        let monitor = monitor.clone();
        std::thread::spawn(move || {
            wait(
                &monitor,
                &name("c1"),
                targets,
                WaitTimeout::After(Duration::from_secs(10)),
                &CancelToken::new(),
            )
        })
    };
    let a = spawn_waiter(StateSet::RUNNING);
    let b = spawn_waiter(StateSet::RUNNING | StateSet::ABORTING);

    while monitor.subscriber_count(&name("c1")) < 2 {
        std::thread::sleep(Duration::from_millis(5));
    }
    monitor.publish(&name("c1"), ContainerState::Running);

    assert_eq!(a.join().unwrap().unwrap(), matched(ContainerState::Running));
    assert_eq!(b.join().unwrap().unwrap(), matched(ContainerState::Running));
}

#[test]
fn rapid_wait_cycles_leave_no_stale_subscriptions() {
    let monitor = StateMonitor::new();
    monitor.publish(&name("c1"), ContainerState::Stopped);

    let publisher = {
        let monitor = monitor.clone();
        std::thread::spawn(move || {
            for _ in 0..200 {
                monitor.publish(&name("c1"), ContainerState::Freezing);
                monitor.publish(&name("c1"), ContainerState::Frozen);
            }
        })
    };

    for _ in 0..50 {
        let _ = wait(
            &monitor,
            &name("c1"),
            StateSet::RUNNING,
            WaitTimeout::After(Duration::from_millis(1)),
            &CancelToken::new(),
        )
        .unwrap();
    }
    publisher.join().unwrap();

    assert_eq!(monitor.subscriber_count(&name("c1")), 0);
}

#[test]
fn reused_token_does_not_accumulate_wakers() {
    let monitor = StateMonitor::new();
    monitor.publish(&name("c1"), ContainerState::Stopped);
    let token = CancelToken::new();

    // One long-lived Ctrl-C token guarding many consecutive waits.
    for _ in 0..100 {
        let outcome = wait(
            &monitor,
            &name("c1"),
            StateSet::RUNNING,
            WaitTimeout::After(Duration::from_millis(1)),
            &token,
        )
        .unwrap();
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert_eq!(token.waker_count(), 0);
    }

    assert_eq!(monitor.subscriber_count(&name("c1")), 0);
}

#[test]
fn publish_racing_the_wait_is_never_lost() {
    for _ in 0..100 {
        let monitor = StateMonitor::new();
        monitor.publish(&name("c1"), ContainerState::Starting);

        let waiter = {
            let monitor = monitor.clone();
            std::thread::spawn(move || {
                wait(
                    &monitor,
                    &name("c1"),
                    StateSet::RUNNING,
                    WaitTimeout::After(Duration::from_secs(5)),
                    &CancelToken::new(),
                )
            })
        };
        // No synchronization on purpose: the publish may land before,
        // during, or after the waiter's subscription setup.
        monitor.publish(&name("c1"), ContainerState::Running);

        let outcome = waiter.join().unwrap().unwrap();
        assert_eq!(outcome, matched(ContainerState::Running));
    }
}
