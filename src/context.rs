#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

//! Per-run handles passed to every driver: status, metrics and shutdown.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::domain::{RunState, StatusBoard};
use crate::error::StressError;
use crate::metrics::Metrics;

/// Receiving half of the process shutdown notification.
#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

#[must_use]
pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Shutdown {
    /// A shutdown that never fires.
    #[must_use]
    pub fn never() -> Self {
        shutdown_channel().1
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown was requested. Pends forever if the trigger is gone.
    pub async fn recv(&mut self) {
        if self.rx.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[derive(Clone)]
pub struct RunContext {
    pub board: StatusBoard,
    pub metrics: Metrics,
    pub shutdown: Shutdown,
}

impl RunContext {
    pub fn new(board: StatusBoard, metrics: Metrics, shutdown: Shutdown) -> Self {
        Self {
            board,
            metrics,
            shutdown,
        }
    }

    /// Sleeps for the hold period. Returns `Interrupted` if shutdown fires first.
    pub async fn hold(&self, seconds: u64) -> Result<(), StressError> {
        self.board
            .begin_hold(seconds, chrono::Utc::now().timestamp());
        self.metrics.mark_hold(seconds);
        let mut shutdown = self.shutdown.clone();
        let sleep = tokio::time::sleep(Duration::from_secs(seconds));
        tokio::pin!(sleep);
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                () = &mut sleep => {
                    self.metrics.hold_remaining_seconds.set(0);
                    return Ok(());
                }
                () = shutdown.recv() => {
                    warn!("shutdown requested during hold period");
                    return Err(StressError::Interrupted);
                }
                _ = tick.tick() => {
                    let remaining = self
                        .board
                        .snapshot(chrono::Utc::now().timestamp())
                        .remaining_seconds;
                    debug!(remaining, "holding");
                    self.metrics
                        .hold_remaining_seconds
                        .set(i64::try_from(remaining).unwrap_or(i64::MAX));
                }
            }
        }
    }

    /// Marks the start of resource release.
    pub fn releasing(&self) {
        self.board.transition(RunState::Releasing);
    }

    pub fn set_held_bytes(&self, bytes: u64) {
        self.board.set_held_bytes(bytes);
        self.metrics.set_held_bytes(bytes);
    }
}
