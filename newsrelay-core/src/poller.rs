//! Scheduled poll/dispatch loop.
//!
//! One cycle is fetch, filter, fan-out. Cycles never overlap, and a shutdown
//! request is only honoured between cycles: a cycle that has started always
//! runs to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::lifecycle::ReadyGate;
use crate::model::{CycleOutcome, CycleReport, DestinationId, Item, LoopState};
use crate::ports::{NotifierPort, SourcePort};
use crate::registry::DestinationRegistry;
use crate::tracker::{SeenTracker, SeenView};

/// Default delay between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy)]
/// Tuning knobs for the loop.
pub struct PollConfig {
    /// Delay between the start of two consecutive cycles.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// The scheduler that owns the seen set and fans new items out.
pub struct PollLoop {
    source: Arc<dyn SourcePort>,
    notifier: Arc<dyn NotifierPort>,
    registry: Arc<DestinationRegistry>,
    tracker: SeenTracker,
    config: PollConfig,
    state: watch::Sender<LoopState>,
    reports: Option<mpsc::UnboundedSender<CycleReport>>,
}

impl PollLoop {
    /// Create a loop with an empty seen set.
    #[must_use]
    pub fn new(
        source: Arc<dyn SourcePort>,
        notifier: Arc<dyn NotifierPort>,
        registry: Arc<DestinationRegistry>,
        config: PollConfig,
    ) -> Self {
        let (state, _) = watch::channel(LoopState::Idle);
        Self {
            source,
            notifier,
            registry,
            tracker: SeenTracker::new(),
            config,
            state,
            reports: None,
        }
    }

    /// Forward a [`CycleReport`] to `reports` after every cycle.
    #[must_use]
    pub fn with_reports(mut self, reports: mpsc::UnboundedSender<CycleReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Read-only view on the seen set for the on-demand path.
    #[must_use]
    pub fn seen_view(&self) -> SeenView {
        self.tracker.view()
    }

    /// Subscribe to loop state transitions.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    /// Run one fetch, filter, and fan-out cycle.
    ///
    /// Never fails: fetch errors skip the cycle without touching the seen set,
    /// and notifier errors are counted and logged per destination.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.set_state(LoopState::Polling);
        debug!(source = self.source.name(), "checking for new articles");

        let items = match self.source.fetch().await {
            Ok(items) => items,
            Err(err) => {
                error!(source = self.source.name(), error = %err, "fetching news failed");
                self.set_state(LoopState::Idle);
                return CycleReport::fetch_failed(err.to_string());
            }
        };

        let fetched = items.len();
        let new_items = self.tracker.filter_new(items).await;
        if new_items.is_empty() {
            info!(fetched, "no new articles found");
            self.set_state(LoopState::Idle);
            return CycleReport::nothing_new(fetched);
        }

        for item in &new_items {
            info!(item = %item.id, title = %item.title, "new article found");
        }

        self.set_state(LoopState::Dispatching);
        let destinations = self.registry.destinations().await;
        let (delivered, failed) = self.fan_out(&new_items, &destinations).await;
        info!(
            new = new_items.len(),
            destinations = destinations.len(),
            delivered,
            failed,
            "dispatch finished"
        );
        self.set_state(LoopState::Idle);

        CycleReport {
            fetched,
            destinations: destinations.len(),
            new_items,
            delivered,
            failed,
            outcome: CycleOutcome::Dispatched,
        }
    }

    /// Drive cycles on the configured interval until `cancel` fires.
    ///
    /// The first cycle starts as soon as `ready` opens. If the gate's handle is
    /// dropped without signalling readiness, the loop stops without polling.
    pub async fn run(mut self, mut ready: ReadyGate, cancel: CancellationToken) {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!("news loop cancelled before readiness");
                self.set_state(LoopState::Stopped);
                return;
            }
            is_ready = ready.wait() => {
                if !is_ready {
                    warn!("readiness signal dropped, news loop not started");
                    self.set_state(LoopState::Stopped);
                    return;
                }
            }
        }

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.config.interval.as_secs(),
            source = self.source.name(),
            "news loop started"
        );

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("news loop shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.run_cycle().await;
                    if let Some(reports) = &self.reports
                        && reports.send(report).is_err()
                    {
                        debug!("cycle report receiver closed");
                        self.reports = None;
                    }
                }
            }
        }

        self.set_state(LoopState::Stopped);
    }

    async fn fan_out(&self, items: &[Item], destinations: &[DestinationId]) -> (usize, usize) {
        let mut delivered = 0;
        let mut failed = 0;

        for item in items {
            let text = item.announcement();
            for destination in destinations {
                match self.notifier.send(destination, &text).await {
                    Ok(()) => delivered += 1,
                    Err(err) => {
                        failed += 1;
                        warn!(
                            item = %item.id,
                            destination = %destination,
                            error = %err,
                            "could not send article to destination"
                        );
                    }
                }
            }
        }

        (delivered, failed)
    }

    fn set_state(&self, state: LoopState) {
        self.state.send_replace(state);
    }
}
