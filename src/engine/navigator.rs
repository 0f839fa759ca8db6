use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, NaiveDate};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::model::*;
use crate::observability::*;
use crate::source::{BusyIntervalSource, SourceError};

use super::classify::classify;
use super::grid::{generate, start_of_week, week_range};
use super::NavigatorError;

/// Tag carried by every fetch; only the latest one may be applied.
pub type Epoch = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavStatus {
    /// Before `init`.
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// One issued fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub epoch: Epoch,
    pub week_start: NaiveDate,
    pub range: Span,
}

/// A fetch result on its way back to the navigator.
#[derive(Debug)]
pub struct FetchOutcome {
    pub ticket: FetchTicket,
    pub result: Result<Vec<BusyInterval>, SourceError>,
}

/// What `apply` did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Committed,
    Failed,
    /// Superseded by a newer epoch; dropped without touching state.
    Stale,
}

/// What a view sees: the current week and status, plus the last grid
/// successfully classified (which may belong to an earlier week while loading
/// or after a failure).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSnapshot {
    pub week_start: Option<NaiveDate>,
    pub epoch: Epoch,
    pub status: NavStatus,
    pub grid_week: Option<NaiveDate>,
    pub slots: Arc<Vec<Slot>>,
}

impl GridSnapshot {
    fn idle() -> Self {
        Self {
            week_start: None,
            epoch: 0,
            status: NavStatus::Idle,
            grid_week: None,
            slots: Arc::new(Vec::new()),
        }
    }
}

/// Week-by-week controller for one view.
///
/// Fetches run as spawned tasks and report back over a channel; the
/// navigator applies them one at a time via [`next_outcome`](Self::next_outcome)
/// and drops any whose epoch is no longer current.
pub struct WeekNavigator {
    hours: Arc<BusinessHours>,
    source: Arc<dyn BusyIntervalSource>,
    clock: Arc<dyn Clock>,
    anchor: Option<NaiveDate>,
    epoch: Epoch,
    status: NavStatus,
    outcome_tx: mpsc::UnboundedSender<FetchOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    published: watch::Sender<GridSnapshot>,
}

impl WeekNavigator {
    pub fn new(
        hours: Arc<BusinessHours>,
        source: Arc<dyn BusyIntervalSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (published, _) = watch::channel(GridSnapshot::idle());
        Self {
            hours,
            source,
            clock,
            anchor: None,
            epoch: 0,
            status: NavStatus::Idle,
            outcome_tx,
            outcome_rx,
            published,
        }
    }

    pub fn anchor(&self) -> Option<NaiveDate> {
        self.anchor
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn status(&self) -> &NavStatus {
        &self.status
    }

    pub fn snapshot(&self) -> GridSnapshot {
        self.published.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GridSnapshot> {
        self.published.subscribe()
    }

    /// Anchor on the week containing `reference_now` and fetch it under epoch 0.
    pub fn init(&mut self, reference_now: Stamp) -> Result<FetchTicket, NavigatorError> {
        if self.status != NavStatus::Idle {
            return Err(NavigatorError::AlreadyInitialized);
        }
        let week_start = start_of_week(reference_now.date());
        self.anchor = Some(week_start);
        self.epoch = 0;
        Ok(self.issue(week_start, "init"))
    }

    /// Move one week back or forward and fetch the new week under a new epoch.
    pub fn navigate(&mut self, direction: Direction) -> Result<FetchTicket, NavigatorError> {
        let anchor = self.anchor.ok_or(NavigatorError::NotInitialized)?;
        let moved = anchor
            .checked_add_signed(Duration::days(direction.days()))
            .ok_or(NavigatorError::OutOfRange)?;
        self.anchor = Some(moved);
        self.epoch += 1;
        Ok(self.issue(moved, "navigate"))
    }

    /// Fetch the current week again under a new epoch.
    pub fn retry(&mut self) -> Result<FetchTicket, NavigatorError> {
        let anchor = self.anchor.ok_or(NavigatorError::NotInitialized)?;
        self.epoch += 1;
        Ok(self.issue(anchor, "retry"))
    }

    fn issue(&mut self, week_start: NaiveDate, reason: &'static str) -> FetchTicket {
        let ticket = FetchTicket {
            epoch: self.epoch,
            week_start,
            range: week_range(week_start),
        };
        self.status = NavStatus::Loading;
        self.publish(None);

        debug!(epoch = ticket.epoch, %week_start, reason, "issuing busy fetch");
        metrics::counter!(FETCHES_TOTAL, "reason" => reason).increment(1);

        let source = Arc::clone(&self.source);
        let tx = self.outcome_tx.clone();
        let t = ticket.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let result = source.fetch_busy(t.range).await;
            metrics::histogram!(FETCH_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
            // Receiver gone means the view was dropped.
            let _ = tx.send(FetchOutcome { ticket: t, result });
        });

        ticket
    }

    /// Apply one fetch outcome if it belongs to the current epoch.
    pub fn apply(&mut self, outcome: FetchOutcome) -> Applied {
        let FetchOutcome { ticket, result } = outcome;
        if ticket.epoch != self.epoch || self.anchor != Some(ticket.week_start) {
            debug!(
                stale = ticket.epoch,
                current = self.epoch,
                "discarding stale busy response"
            );
            metrics::counter!(STALE_RESPONSES_TOTAL).increment(1);
            return Applied::Stale;
        }

        match result {
            Ok(busy) => {
                let skeleton = generate(ticket.week_start, &self.hours, self.clock.now());
                let slots = classify(&skeleton, &busy);
                record_slot_gauges(&slots);
                info!(
                    week = %ticket.week_start,
                    epoch = ticket.epoch,
                    busy = busy.len(),
                    slots = slots.len(),
                    "week ready"
                );
                self.status = NavStatus::Ready;
                self.publish(Some((ticket.week_start, slots)));
                Applied::Committed
            }
            Err(e) => {
                warn!(week = %ticket.week_start, epoch = ticket.epoch, "busy fetch failed: {e}");
                metrics::counter!(FETCH_FAILURES_TOTAL).increment(1);
                self.status = NavStatus::Failed(e.to_string());
                self.publish(None);
                Applied::Failed
            }
        }
    }

    /// Wait for the next fetch to come back and apply it.
    pub async fn next_outcome(&mut self) -> Option<Applied> {
        let outcome = self.outcome_rx.recv().await?;
        Some(self.apply(outcome))
    }

    /// Apply outcomes until the current epoch has landed (Ready or Failed).
    pub async fn settle(&mut self) -> Option<Applied> {
        loop {
            match self.next_outcome().await? {
                Applied::Stale => continue,
                applied => return Some(applied),
            }
        }
    }

    /// Push the current state to subscribers. `grid` replaces the published
    /// slots; `None` keeps whatever was last published.
    fn publish(&self, grid: Option<(NaiveDate, Vec<Slot>)>) {
        let previous = self.published.borrow().clone();
        let (grid_week, slots) = match grid {
            Some((week, slots)) => (Some(week), Arc::new(slots)),
            None => (previous.grid_week, previous.slots),
        };
        self.published.send_replace(GridSnapshot {
            week_start: self.anchor,
            epoch: self.epoch,
            status: self.status.clone(),
            grid_week,
            slots,
        });
    }
}

fn record_slot_gauges(slots: &[Slot]) {
    let mut counts = [0usize; 3];
    for slot in slots {
        counts[match slot.state() {
            SlotState::Available => 0,
            SlotState::Booked => 1,
            SlotState::Past => 2,
        }] += 1;
    }
    metrics::gauge!(SLOTS_PUBLISHED, "state" => "available").set(counts[0] as f64);
    metrics::gauge!(SLOTS_PUBLISHED, "state" => "booked").set(counts[1] as f64);
    metrics::gauge!(SLOTS_PUBLISHED, "state" => "past").set(counts[2] as f64);
}
