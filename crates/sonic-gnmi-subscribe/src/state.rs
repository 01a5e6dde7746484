//! Per-subscription coordination primitives (spec §3 `SubscriptionState`,
//! §5 cancellation).
//!
//! Tokio has no public `WaitGroup`, so the per-subscription sync gate (one
//! permit per worker; StreamRun awaits all of them) is built on
//! `tokio::sync::mpsc` instead — an explicit, idiomatic substitution, not a
//! behavior change (SPEC_FULL §4.6).

use tokio::sync::{mpsc, watch};

/// Cooperative stop signal: cloneable, observed by every worker's select
/// loop. Closing/setting `true` causes termination within one tick
/// interval (SAMPLE) or the 500 ms pub/sub receive timeout (ON_CHANGE).
#[derive(Clone)]
pub struct StopHandle {
    rx: watch::Receiver<bool>,
}

impl StopHandle {
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the stop signal has been set, for use in a `select!`
    /// branch.
    pub async fn wait_for_stop(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

pub struct StopController {
    tx: watch::Sender<bool>,
}

impl StopController {
    pub fn new() -> (Self, StopHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, StopHandle { rx })
    }

    pub fn handle(&self) -> StopHandle {
        StopHandle {
            rx: self.tx.subscribe(),
        }
    }

    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }
}

/// Per-subscription initial-sync gate: every worker sends one permit after
/// emitting its initial value; StreamRun awaits `n` signals, then
/// force-enqueues the `syncResponse=true` marker (spec §4.6 "Initial-sync
/// protocol").
pub struct SyncGate {
    tx: mpsc::Sender<()>,
    rx: mpsc::Receiver<()>,
    expected: usize,
}

impl SyncGate {
    pub fn new(expected: usize) -> Self {
        let (tx, rx) = mpsc::channel(expected.max(1));
        Self { tx, rx, expected }
    }

    pub fn signaller(&self) -> SyncSignaller {
        SyncSignaller { tx: self.tx.clone() }
    }

    /// Awaits every worker's signal. A worker that never signals (e.g. it
    /// panicked before reaching its initial emit) would hang this forever;
    /// callers pair this with a fatal-marker path that always signals
    /// before returning on error (spec §7 "Propagation policy").
    pub async fn wait_all(mut self) {
        for _ in 0..self.expected {
            if self.rx.recv().await.is_none() {
                break;
            }
        }
    }
}

#[derive(Clone)]
pub struct SyncSignaller {
    tx: mpsc::Sender<()>,
}

impl SyncSignaller {
    pub async fn signal(&self) {
        let _ = self.tx.send(()).await;
    }
}
