use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};

use slotwise::clock::{Clock, SystemClock};
use slotwise::config::Settings;
use slotwise::engine::WeekNavigator;
use slotwise::gcal::GoogleCalendarSource;
use slotwise::layout::WeekLayout;
use slotwise::source::{BusyIntervalSource, StaticSource};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let settings = Settings::from_env()?;
    slotwise::observability::init(settings.metrics_port)?;

    let hours = Arc::new(settings.site.business_hours.clone());
    let source: Arc<dyn BusyIntervalSource> = match &settings.site.google_calendar_config {
        Some(calendar) => {
            info!("  calendar: {}", calendar.calendar_id);
            Arc::new(GoogleCalendarSource::new(calendar, settings.authority)?)
        }
        None => {
            warn!("no calendar configured, every future slot shows as available");
            Arc::new(StaticSource::empty())
        }
    };

    let clock = Arc::new(SystemClock::new(settings.authority));
    let now = clock.now();
    let start = now
        .checked_add_signed(Duration::weeks(i64::from(settings.week_offset)))
        .unwrap_or(now);

    let mut navigator = WeekNavigator::new(hours.clone(), source, clock);
    let ticket = navigator.init(start)?;
    info!("slotwise watching week of {}", ticket.week_start);
    info!("  slots per week: {}", hours.slots_per_week());
    info!("  refresh: {}s", settings.refresh.as_secs());
    info!("  metrics: {}", settings.metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    warn!("SIGTERM handler unavailable: {e}");
                    ctrl_c.await.ok();
                }
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
    };

    let stats = slotwise::watch::run(&mut navigator, settings.refresh, shutdown, |snapshot| {
        println!("{}", WeekLayout::new(&snapshot.slots, &hours).render_text());
    })
    .await;

    info!(
        committed = stats.committed,
        failed = stats.failed,
        stale = stats.stale,
        "slotwise stopped"
    );
    Ok(())
}
