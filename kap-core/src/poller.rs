use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::PollError;
use crate::message::format_message;
use crate::notifier::Notifier;
use crate::price::PriceLookup;
use crate::source::{portal_offset, AnnouncementSource};
use crate::storage::SeenStore;

/// Time formats the portal uses for disclosure timestamps.
const TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%d.%m.%Y %H:%M", "%d.%m.%y %H:%M"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub backoff: Duration,
    /// Only the first `max_items` records of a fetch are looked at.
    pub max_items: usize,
    pub recent_window: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            backoff: Duration::from_secs(60),
            max_items: 10,
            recent_window: None,
        }
    }
}

impl PollConfig {
    pub fn delay_for(&self, state: PollState) -> Duration {
        match state {
            PollState::Polling => self.interval,
            PollState::Backoff => self.backoff,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Backoff,
}

impl PollState {
    /// State to wait in after a cycle: a failed fetch backs off.
    pub fn after<T, E>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => PollState::Polling,
            Err(_) => PollState::Backoff,
        }
    }
}

/// Last time the poller started a cycle, shared read-only with the health
/// endpoint. Stored as unix seconds, 0 meaning never.
#[derive(Debug, Clone, Default)]
pub struct PollStatus {
    last_checked: Arc<AtomicI64>,
}

impl PollStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, at: DateTime<Utc>) {
        self.last_checked.store(at.timestamp(), Ordering::Relaxed);
    }

    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        match self.last_checked.load(Ordering::Relaxed) {
            0 => None,
            secs => DateTime::from_timestamp(secs, 0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub considered: usize,
    pub already_seen: usize,
    pub too_old: usize,
    pub delivered: usize,
    pub failed: usize,
    pub persisted: bool,
}

/// Everything one poll cycle needs, owned in one place: the collaborators,
/// the seen store and the timing knobs.
pub struct PollCycle {
    source: Box<dyn AnnouncementSource>,
    prices: Box<dyn PriceLookup>,
    notifier: Box<dyn Notifier>,
    store: SeenStore,
    config: PollConfig,
    status: PollStatus,
}

impl PollCycle {
    pub fn new(
        source: Box<dyn AnnouncementSource>,
        prices: Box<dyn PriceLookup>,
        notifier: Box<dyn Notifier>,
        store: SeenStore,
        config: PollConfig,
    ) -> Self {
        Self {
            source,
            prices,
            notifier,
            store,
            config,
            status: PollStatus::new(),
        }
    }

    pub fn with_status(mut self, status: PollStatus) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> PollStatus {
        self.status.clone()
    }

    pub fn store(&self) -> &SeenStore {
        &self.store
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Fetch, filter, enrich, notify, persist.
    ///
    /// A key is committed to the store only after the notifier accepted the
    /// message, so a failed delivery is offered again next cycle. The store
    /// is saved once per cycle, after the whole batch.
    pub async fn poll_once(&mut self) -> Result<CycleReport, PollError> {
        self.status.record(Utc::now());

        let announcements = self
            .source
            .fetch()
            .await
            .map_err(|error| PollError::Source {
                source_name: self.source.name(),
                error,
            })?;

        let mut report = CycleReport {
            fetched: announcements.len(),
            ..CycleReport::default()
        };
        let now = Utc::now().with_timezone(&portal_offset()).naive_local();

        for announcement in announcements.into_iter().take(self.config.max_items) {
            report.considered += 1;
            let key = announcement.key();

            if self.store.contains(&key) {
                report.already_seen += 1;
                continue;
            }
            if let Some(window) = self.config.recent_window {
                if !is_recent(&announcement.time, now, window) {
                    debug!(%key, "outside recent window");
                    report.too_old += 1;
                    continue;
                }
            }

            let price = self.prices.lookup(&announcement.company).await;
            let text = format_message(&announcement, &price);

            match self.notifier.send(&text).await {
                Ok(()) => {
                    info!(company = %announcement.company, subject = %announcement.subject, "announcement delivered");
                    self.store.mark_seen(key);
                    report.delivered += 1;
                }
                Err(err) => {
                    warn!(%key, error = %err, "delivery failed, will retry next cycle");
                    report.failed += 1;
                }
            }
        }

        match self.store.save().await {
            Ok(()) => report.persisted = true,
            Err(err) => warn!(error = %err, "failed to persist seen store"),
        }

        Ok(report)
    }

    /// Polls until `cancel` fires (or its sender is dropped). A cycle in
    /// flight is finished before the signal is observed.
    pub async fn run(mut self, mut cancel: broadcast::Receiver<()>) {
        info!(
            source = self.source.name(),
            interval = ?self.config.interval,
            seen = self.store.len(),
            "poller started"
        );

        loop {
            let result = self.poll_once().await;
            let state = PollState::after(&result);
            let delay = self.config.delay_for(state);

            match &result {
                Ok(report) => info!(
                    fetched = report.fetched,
                    delivered = report.delivered,
                    failed = report.failed,
                    already_seen = report.already_seen,
                    next_in = ?delay,
                    "poll cycle finished"
                ),
                Err(err) => warn!(error = %err, next_in = ?delay, "poll cycle failed, backing off"),
            }

            tokio::select! {
                _ = cancel.recv() => {
                    info!("poller shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Whether a disclosure time lies within `window` of `now`. Times in an
/// unknown format count as recent so they are never silently dropped.
pub fn is_recent(time: &str, now: NaiveDateTime, window: Duration) -> bool {
    let Some(published) = TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(time.trim(), fmt).ok())
    else {
        return true;
    };
    let Ok(window) = chrono::Duration::from_std(window) else {
        return true;
    };
    now.signed_duration_since(published) <= window
}

pub struct PollerHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl PollerHandle {
    pub async fn stop(self) -> Result<(), PollError> {
        let _ = self.cancel_tx.send(());
        self.join.await.map_err(PollError::from)
    }
}

pub fn spawn_poller(cycle: PollCycle) -> PollerHandle {
    let (cancel_tx, cancel_rx) = broadcast::channel(1);
    let join = tokio::spawn(cycle.run(cancel_rx));
    PollerHandle { cancel_tx, join }
}
