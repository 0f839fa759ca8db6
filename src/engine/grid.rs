use chrono::{Datelike, Days, NaiveDate};

use crate::model::*;

// ── Week arithmetic ───────────────────────────────────────────────

/// Monday on or before `anchor`.
pub fn start_of_week(anchor: NaiveDate) -> NaiveDate {
    let back = anchor.weekday().num_days_from_monday() as u64;
    anchor.checked_sub_days(Days::new(back)).unwrap_or(anchor)
}

/// `[Monday 00:00, next Monday 00:00)` for the week containing `anchor`.
pub fn week_range(anchor: NaiveDate) -> Span {
    let monday = start_of_week(anchor);
    let next = monday.checked_add_days(Days::new(7)).unwrap_or(monday);
    Span::new(
        monday.and_time(chrono::NaiveTime::MIN),
        next.and_time(chrono::NaiveTime::MIN),
    )
}

// ── Slot generation ───────────────────────────────────────────────

/// Build the unclassified slot skeleton for the week containing `anchor`.
///
/// Ordered by ascending day index, then ascending hour. `is_booked` is
/// always false here; `is_past` is `time < now`.
pub fn generate(anchor: NaiveDate, hours: &BusinessHours, now: Stamp) -> Vec<Slot> {
    let monday = start_of_week(anchor);
    let mut slots = Vec::with_capacity(hours.slots_per_week());

    for (day_index, day) in hours.iter() {
        let Some(date) = monday.checked_add_days(Days::new(day_index as u64)) else {
            continue;
        };
        for hour in day.hours() {
            let Some(time) = date.and_hms_opt(hour, 0, 0) else {
                continue;
            };
            slots.push(Slot {
                date,
                hour,
                time,
                day_index,
                is_past: time < now,
                is_booked: false,
            });
        }
    }

    slots
}
