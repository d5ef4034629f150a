//! services/client/src/http/refresh.rs
//!
//! Serializes token refreshes: when many requests 401 at once, exactly one
//! of them performs the refresh call and the rest wait for its verdict.
//!
//! One gate instance lives inside each transport. It is constructed, never
//! global, so every test (and every client) gets its own.

use tokio::sync::{oneshot, Mutex};

/// How an in-flight refresh ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshVerdict {
    /// The refresh succeeded; waiting requests should replay.
    Refreshed,
    /// The refresh failed; the session is gone and waiting requests must
    /// fail with a session-expired error.
    Expired,
}

/// What a 401-ing request should do next.
#[derive(Debug)]
pub enum RefreshTicket {
    /// This request performs the refresh call and must `settle` the gate.
    Leader,
    /// Another request is already refreshing; await its verdict.
    Follower(oneshot::Receiver<RefreshVerdict>),
}

#[derive(Debug, Default)]
struct GateInner {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshVerdict>>,
}

/// The at-most-one-refresh-in-flight coordinator.
#[derive(Debug, Default)]
pub struct RefreshGate {
    inner: Mutex<GateInner>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the refresh or joins the queue for the one in flight.
    pub async fn begin(&self) -> RefreshTicket {
        let mut inner = self.inner.lock().await;
        if inner.in_flight {
            let (tx, rx) = oneshot::channel();
            inner.waiters.push(tx);
            RefreshTicket::Follower(rx)
        } else {
            inner.in_flight = true;
            RefreshTicket::Leader
        }
    }

    /// Ends the in-flight refresh and hands every queued waiter the verdict,
    /// in the order they enqueued. After this the gate is ready for a future
    /// 401 to start a fresh cycle.
    pub async fn settle(&self, verdict: RefreshVerdict) {
        let mut inner = self.inner.lock().await;
        inner.in_flight = false;
        for waiter in inner.waiters.drain(..) {
            // A waiter may have been dropped (its task cancelled); that is
            // its problem, not ours.
            let _ = waiter.send(verdict);
        }
    }
}
