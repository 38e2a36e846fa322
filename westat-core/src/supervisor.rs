//! Clock ticker and refresh worker supervision.

use std::time::Duration;

use chrono::Local;
use tokio::{sync::mpsc, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{controller::ControllerEvent, scheduler::RefreshScheduler};

/// Owns the refresh worker's task handle and replaces the worker when it
/// terminates while the display is still running.
#[derive(Debug)]
pub struct Supervisor {
    scheduler: RefreshScheduler,
    handle: Option<JoinHandle<()>>,
    cancel: CancellationToken,
    restarts: usize,
}

impl Supervisor {
    /// Spawn the first refresh worker.
    pub fn start(scheduler: RefreshScheduler, cancel: CancellationToken) -> Self {
        let handle = scheduler.spawn();
        Self {
            scheduler,
            handle: Some(handle),
            cancel,
            restarts: 0,
        }
    }

    /// Respawn the refresh worker if it has terminated. Returns `true` when a
    /// new worker was started.
    pub async fn ensure_alive(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if self.handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        if let Some(dead) = self.handle.replace(self.scheduler.spawn()) {
            match dead.await {
                Ok(()) => warn!("refresh worker exited unexpectedly"),
                Err(e) => error!(error = %e, "refresh worker died"),
            }
        }

        self.restarts += 1;
        info!(restarts = self.restarts, "refresh worker respawned");
        true
    }

    pub fn restarts(&self) -> usize {
        self.restarts
    }

    /// Cancel the refresh worker and wait for it to finish.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                debug!(error = %e, "refresh worker ended with error");
            }
        }
    }
}

/// Once per period: send the current time to the display, then check that
/// the refresh worker is still alive.
#[derive(Debug)]
pub struct ClockTicker {
    events: mpsc::Sender<ControllerEvent>,
    period: Duration,
    cancel: CancellationToken,
}

impl ClockTicker {
    pub fn new(
        events: mpsc::Sender<ControllerEvent>,
        period: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            events,
            period,
            cancel,
        }
    }

    pub fn spawn(self, supervisor: Supervisor) -> JoinHandle<Supervisor> {
        tokio::spawn(self.run(supervisor))
    }

    /// Runs until cancelled or until the display stops listening, then shuts
    /// the refresh worker down and hands the supervisor back.
    pub async fn run(self, mut supervisor: Supervisor) -> Supervisor {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = time::sleep(self.period) => {}
            }

            let sent = tokio::select! {
                _ = self.cancel.cancelled() => break,
                sent = self.events.send(ControllerEvent::Tick(Local::now())) => sent,
            };
            if sent.is_err() {
                debug!("display gone, clock stopping");
                break;
            }

            supervisor.ensure_alive().await;
        }

        supervisor.shutdown().await;
        info!(restarts = supervisor.restarts(), "clock stopped");
        supervisor
    }
}
