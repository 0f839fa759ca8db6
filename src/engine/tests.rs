use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::oneshot;
use tokio_test::{assert_err, assert_ok};

use super::*;
use crate::clock::FixedClock;
use crate::model::*;
use crate::source::{BusyIntervalSource, SourceError, StaticSource};

type Reply = Result<Vec<BusyInterval>, SourceError>;

fn at(d: u32, h: u32, m: u32) -> Stamp {
    NaiveDate::from_ymd_opt(2025, 1, d)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn monday(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}

/// Wednesday 2025-01-15 10:30; its week starts Monday the 13th.
fn wednesday_morning() -> Stamp {
    at(15, 10, 30)
}

/// Source that answers immediately unless a gate was registered for the
/// requested week, in which case it waits for the test to release it.
#[derive(Default)]
struct GatedSource {
    calls: Mutex<Vec<Span>>,
    gates: Mutex<HashMap<NaiveDate, oneshot::Receiver<Reply>>>,
}

impl GatedSource {
    fn gate(&self, week_start: NaiveDate) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(week_start, rx);
        tx
    }

    fn calls(&self) -> Vec<Span> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BusyIntervalSource for GatedSource {
    async fn fetch_busy(&self, range: Span) -> Result<Vec<BusyInterval>, SourceError> {
        self.calls.lock().unwrap().push(range);
        let gate = self.gates.lock().unwrap().remove(&range.start.date());
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(SourceError::Unavailable("gate dropped".into()))),
            None => Ok(Vec::new()),
        }
    }
}

fn navigator(source: Arc<dyn BusyIntervalSource>) -> WeekNavigator {
    WeekNavigator::new(
        Arc::new(BusinessHours::reference()),
        source,
        Arc::new(FixedClock(wednesday_morning())),
    )
}

fn booked_times(snapshot: &GridSnapshot) -> Vec<Stamp> {
    snapshot
        .slots
        .iter()
        .filter(|s| s.is_booked)
        .map(|s| s.time)
        .collect()
}

// ── Lifecycle ────────────────────────────────────────────

#[tokio::test]
async fn init_fetches_current_week_at_epoch_zero() {
    let source = Arc::new(GatedSource::default());
    let mut nav = navigator(source.clone());
    assert_eq!(nav.status(), &NavStatus::Idle);

    let ticket = assert_ok!(nav.init(wednesday_morning()));
    assert_eq!(ticket.epoch, 0);
    assert_eq!(ticket.week_start, monday(13));
    assert_eq!(ticket.range, week_range(monday(13)));
    assert_eq!(nav.status(), &NavStatus::Loading);

    assert_eq!(nav.settle().await, Some(Applied::Committed));
    assert_eq!(nav.status(), &NavStatus::Ready);

    let snap = nav.snapshot();
    assert_eq!(snap.week_start, Some(monday(13)));
    assert_eq!(snap.grid_week, Some(monday(13)));
    assert_eq!(snap.slots.len(), 56);
    assert_eq!(source.calls(), vec![week_range(monday(13))]);
}

#[tokio::test]
async fn navigate_before_init_is_rejected() {
    let mut nav = navigator(Arc::new(StaticSource::empty()));
    assert_eq!(nav.navigate(Direction::Next), Err(NavigatorError::NotInitialized));
    assert_eq!(nav.retry(), Err(NavigatorError::NotInitialized));
    assert_eq!(nav.status(), &NavStatus::Idle);
}

#[tokio::test]
async fn init_twice_is_rejected() {
    let mut nav = navigator(Arc::new(StaticSource::empty()));
    assert_ok!(nav.init(wednesday_morning()));
    assert_eq!(nav.init(wednesday_morning()), Err(NavigatorError::AlreadyInitialized));
}

#[tokio::test]
async fn next_then_previous_returns_and_refetches() {
    let source = Arc::new(GatedSource::default());
    let mut nav = navigator(source.clone());

    nav.init(wednesday_morning()).unwrap();
    nav.settle().await;
    let original = nav.anchor();

    let next = nav.navigate(Direction::Next).unwrap();
    assert_eq!(next.week_start, monday(20));
    nav.settle().await;

    let back = nav.navigate(Direction::Previous).unwrap();
    assert_eq!(nav.settle().await, Some(Applied::Committed));

    assert_eq!(nav.anchor(), original);
    assert_eq!(back.epoch, 2);
    assert_eq!(
        source.calls(),
        vec![
            week_range(monday(13)),
            week_range(monday(20)),
            week_range(monday(13)),
        ]
    );
}

#[tokio::test]
async fn future_week_has_no_past_slots() {
    let mut nav = navigator(Arc::new(StaticSource::empty()));
    nav.init(wednesday_morning()).unwrap();
    nav.settle().await;
    nav.navigate(Direction::Next).unwrap();
    nav.settle().await;

    let snap = nav.snapshot();
    assert_eq!(snap.grid_week, Some(monday(20)));
    assert!(snap.slots.iter().all(|s| s.state() == SlotState::Available));
}

// ── Epoch guard ──────────────────────────────────────────

#[tokio::test]
async fn rapid_double_next_applies_only_latest_epoch() {
    let source = Arc::new(GatedSource::default());
    let mut nav = navigator(source.clone());
    nav.init(wednesday_morning()).unwrap();
    nav.settle().await;

    let first_gate = source.gate(monday(20));
    let second_gate = source.gate(monday(27));

    let first = nav.navigate(Direction::Next).unwrap();
    let second = nav.navigate(Direction::Next).unwrap();
    assert_eq!((first.epoch, second.epoch), (1, 2));

    // Newer week answers first.
    second_gate
        .send(Ok(vec![Span::new(at(29, 9, 0), at(29, 10, 0))]))
        .unwrap();
    assert_eq!(nav.next_outcome().await, Some(Applied::Committed));
    let after_latest = nav.snapshot();
    assert_eq!(after_latest.grid_week, Some(monday(27)));
    assert_eq!(booked_times(&after_latest), vec![at(29, 9, 0)]);

    // Older week arrives last and must not overwrite it.
    first_gate
        .send(Ok(vec![Span::new(at(22, 9, 0), at(22, 17, 0))]))
        .unwrap();
    assert_eq!(nav.next_outcome().await, Some(Applied::Stale));
    assert_eq!(nav.snapshot(), after_latest);
    assert_eq!(nav.status(), &NavStatus::Ready);
    assert_eq!(nav.epoch(), 2);
}

#[tokio::test]
async fn stale_failure_does_not_fail_current_week() {
    let source = Arc::new(GatedSource::default());
    let mut nav = navigator(source.clone());
    nav.init(wednesday_morning()).unwrap();
    nav.settle().await;

    let first_gate = source.gate(monday(20));
    nav.navigate(Direction::Next).unwrap();
    nav.navigate(Direction::Next).unwrap();
    assert_eq!(nav.next_outcome().await, Some(Applied::Committed));

    first_gate
        .send(Err(SourceError::Unavailable("timeout".into())))
        .unwrap();
    assert_eq!(nav.next_outcome().await, Some(Applied::Stale));
    assert_eq!(nav.status(), &NavStatus::Ready);
}

#[tokio::test]
async fn apply_drops_outcome_from_older_epoch() {
    let mut nav = navigator(Arc::new(StaticSource::empty()));
    let ticket = nav.init(wednesday_morning()).unwrap();
    nav.settle().await;
    nav.retry().unwrap();

    let applied = nav.apply(FetchOutcome {
        ticket,
        result: Ok(vec![Span::new(at(16, 8, 0), at(16, 18, 0))]),
    });
    assert_eq!(applied, Applied::Stale);
    assert_eq!(nav.status(), &NavStatus::Loading);
}

#[tokio::test]
async fn unresolved_fetch_stays_loading() {
    let source = Arc::new(GatedSource::default());
    let _gate = source.gate(monday(13));
    let mut nav = navigator(source.clone());
    nav.init(wednesday_morning()).unwrap();

    let waited = tokio::time::timeout(Duration::from_millis(50), nav.next_outcome()).await;
    assert_err!(waited);
    assert_eq!(nav.status(), &NavStatus::Loading);
}

// ── Failure and retry ────────────────────────────────────

#[tokio::test]
async fn failure_keeps_previous_grid_until_retry() {
    let source = Arc::new(GatedSource::default());
    let mut nav = navigator(source.clone());
    nav.init(wednesday_morning()).unwrap();
    nav.settle().await;

    let gate = source.gate(monday(20));
    nav.navigate(Direction::Next).unwrap();
    gate.send(Err(SourceError::Rejected {
        status: 403,
        message: "quota exceeded".into(),
    }))
    .unwrap();
    assert_eq!(nav.settle().await, Some(Applied::Failed));

    let NavStatus::Failed(msg) = nav.status().clone() else {
        panic!("expected Failed, got {:?}", nav.status());
    };
    assert!(msg.contains("quota exceeded"));
    let snap = nav.snapshot();
    assert_eq!(snap.week_start, Some(monday(20)));
    assert_eq!(snap.grid_week, Some(monday(13)));

    let retry = nav.retry().unwrap();
    assert_eq!(retry.epoch, 2);
    assert_eq!(retry.week_start, monday(20));
    assert_eq!(nav.settle().await, Some(Applied::Committed));
    assert_eq!(nav.snapshot().grid_week, Some(monday(20)));
}

#[tokio::test]
async fn dropped_source_reply_fails_current_week() {
    let source = Arc::new(GatedSource::default());
    let gate = source.gate(monday(13));
    let mut nav = navigator(source.clone());
    nav.init(wednesday_morning()).unwrap();
    drop(gate);

    assert_eq!(nav.settle().await, Some(Applied::Failed));
    assert!(nav.snapshot().slots.is_empty());
}

// ── Publishing ───────────────────────────────────────────

#[tokio::test]
async fn subscribers_see_loading_then_ready() {
    let busy = vec![Span::new(at(15, 14, 0), at(15, 15, 0))];
    let mut nav = navigator(Arc::new(StaticSource::new(busy)));
    let mut rx = nav.subscribe();
    assert_eq!(rx.borrow().status, NavStatus::Idle);

    nav.init(wednesday_morning()).unwrap();
    assert_eq!(rx.borrow_and_update().status, NavStatus::Loading);

    nav.settle().await;
    assert_ok!(rx.changed().await);
    let snap = rx.borrow_and_update().clone();
    assert_eq!(snap.status, NavStatus::Ready);
    assert_eq!(booked_times(&snap), vec![at(15, 14, 0)]);

    let wednesday: Vec<_> = snap.slots.iter().filter(|s| s.day_index == 2).collect();
    let states: Vec<_> = wednesday.iter().map(|s| (s.hour, s.state())).collect();
    assert_eq!(
        states,
        vec![
            (8, SlotState::Past),
            (9, SlotState::Past),
            (10, SlotState::Past),
            (11, SlotState::Available),
            (12, SlotState::Available),
            (13, SlotState::Available),
            (14, SlotState::Booked),
            (15, SlotState::Available),
            (16, SlotState::Available),
            (17, SlotState::Available),
        ]
    );
}

#[tokio::test]
async fn independent_navigators_share_nothing() {
    let mut a = navigator(Arc::new(StaticSource::empty()));
    let mut b = navigator(Arc::new(StaticSource::empty()));
    a.init(wednesday_morning()).unwrap();
    b.init(wednesday_morning()).unwrap();

    a.navigate(Direction::Next).unwrap();
    a.navigate(Direction::Next).unwrap();
    a.settle().await;
    b.settle().await;

    assert_eq!(a.epoch(), 2);
    assert_eq!(b.epoch(), 0);
    assert_eq!(b.snapshot().grid_week, Some(monday(13)));
}
