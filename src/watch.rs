use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::{Applied, GridSnapshot, NavStatus, WeekNavigator};

/// Counts of what the watch loop applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    pub committed: u64,
    pub failed: u64,
    pub stale: u64,
}

/// Keep an initialized navigator current until `shutdown` resolves.
///
/// Every committed week is handed to `on_ready`; the current week is
/// refetched every `refresh` via `retry`, so a failed fetch recovers on the
/// next tick. A tick that finds the current fetch still in flight is skipped;
/// retrying then would only make the pending response stale.
pub async fn run<F>(
    navigator: &mut WeekNavigator,
    refresh: Duration,
    shutdown: F,
    mut on_ready: impl FnMut(&GridSnapshot),
) -> WatchStats
where
    F: Future<Output = ()>,
{
    let mut stats = WatchStats::default();
    let mut ticker = tokio::time::interval(refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick fires immediately; the initial fetch is already in flight.
    ticker.tick().await;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            applied = navigator.next_outcome() => match applied {
                Some(Applied::Committed) => {
                    stats.committed += 1;
                    on_ready(&navigator.snapshot());
                }
                Some(Applied::Failed) => stats.failed += 1,
                Some(Applied::Stale) => stats.stale += 1,
                None => break,
            },
            _ = ticker.tick() => {
                if navigator.status() == &NavStatus::Loading {
                    debug!(epoch = navigator.epoch(), "fetch still in flight, skipping refresh");
                } else if let Err(e) = navigator.retry() {
                    warn!("refresh skipped: {e}");
                }
            }
            _ = &mut shutdown => {
                info!("shutdown signal received, stopping watch loop");
                break;
            }
        }
    }

    stats
}
