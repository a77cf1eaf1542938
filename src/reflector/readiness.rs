use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;

/// Result of waiting on a [`ReadinessGate`]. Neither variant is an error:
/// a timed-out wait still lets the caller go on and issue calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    Ready,
    TimedOut,
}

/// One-shot latch flipped by the extension's ready event. Never reverts.
#[derive(Debug)]
pub struct ReadinessGate {
    state: watch::Sender<bool>,
    waited: AtomicBool,
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state,
            waited: AtomicBool::new(false),
        }
    }

    /// Flip the latch. Returns `false` if it was already open.
    pub fn mark_ready(&self) -> bool {
        self.state.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    pub fn is_ready(&self) -> bool {
        *self.state.borrow()
    }

    /// Whether some caller has completed a wait on this gate, successful or not.
    pub fn wait_attempted(&self) -> bool {
        self.waited.load(Ordering::SeqCst)
    }

    /// Suspend until ready or until `timeout` elapses.
    pub async fn wait(&self, timeout: Duration) -> ReadyOutcome {
        let outcome = if self.is_ready() {
            ReadyOutcome::Ready
        } else {
            let mut rx = self.state.subscribe();
            let waited = tokio::time::timeout(timeout, rx.wait_for(|ready| *ready)).await;
            if matches!(waited, Ok(Ok(_))) {
                ReadyOutcome::Ready
            } else {
                ReadyOutcome::TimedOut
            }
        };
        self.waited.store(true, Ordering::SeqCst);
        outcome
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}
