//! Periodic report refresh worker.

use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, sync::watch, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    controller::{ControllerEvent, Update},
    delta,
    fetcher::{FetchError, ReportFetcher, fetch_within},
    history::HistoryStore,
    model::{FieldId, Report},
};

/// What a single refresh cycle did.
#[derive(Debug)]
pub enum CycleOutcome {
    Unchanged,
    Changed,
    Failed(FetchError),
}

/// Everything a refresh worker needs; cloned into each spawned task so a
/// replacement worker continues with the same state.
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    station_id: String,
    fetcher: Arc<dyn ReportFetcher>,
    history: Arc<HistoryStore>,
    current: Arc<watch::Sender<Report>>,
    events: mpsc::Sender<ControllerEvent>,
    period: Duration,
    fetch_timeout: Duration,
    cancel: CancellationToken,
}

impl RefreshScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        station_id: String,
        fetcher: Arc<dyn ReportFetcher>,
        history: Arc<HistoryStore>,
        initial: Report,
        events: mpsc::Sender<ControllerEvent>,
        period: Duration,
        fetch_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (current, _) = watch::channel(initial);

        Self {
            station_id,
            fetcher,
            history,
            current: Arc::new(current),
            events,
            period,
            fetch_timeout,
            cancel,
        }
    }

    /// The report the display was last updated with.
    pub fn current(&self) -> Report {
        self.current.borrow().clone()
    }

    pub fn spawn(&self) -> JoinHandle<()> {
        let worker = self.clone();
        tokio::spawn(async move { worker.run().await })
    }

    /// Sleep one period, refresh, repeat until cancelled.
    ///
    /// Fetch failures end the cycle, never the loop.
    pub async fn run(self) {
        info!(station = %self.station_id, period = ?self.period, "refresh worker started");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = time::sleep(self.period) => {}
            }

            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => break,
                outcome = self.refresh_once() => outcome,
            };

            match outcome {
                CycleOutcome::Unchanged => debug!("report unchanged"),
                CycleOutcome::Changed => {}
                CycleOutcome::Failed(e) => warn!(error = %e, "refresh cycle abandoned"),
            }
        }

        info!("refresh worker stopped");
    }

    /// One fetch-compare-apply cycle.
    pub async fn refresh_once(&self) -> CycleOutcome {
        debug!(station = %self.station_id, "trying update");

        let fetch = fetch_within(&*self.fetcher, &self.station_id, self.fetch_timeout);
        let report = match fetch.await {
            Ok(report) => report,
            Err(e) => return CycleOutcome::Failed(e),
        };

        if self.current.borrow().time() == report.time() {
            return CycleOutcome::Unchanged;
        }

        let previous = self.current.send_replace(report.clone());
        info!(time = %report.time(), previous = %previous.time(), "new report");

        if let Err(e) = self.history.append(report.reading()) {
            warn!(error = %e, "reading not persisted");
        }

        let deltas = delta::diff(&previous.snapshot, &report.snapshot, &FieldId::NUMERIC);
        let event = ControllerEvent::Apply(Update { report, deltas });
        if self.events.send(event).await.is_err() {
            debug!("display gone, update dropped");
        }

        CycleOutcome::Changed
    }
}
