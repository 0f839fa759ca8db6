//! Grid view-model over a classified week: day columns, hour rows and
//! the labels the booking page shows.

use std::fmt::Write as _;
use std::ops::Range;

use chrono::{NaiveDate, Timelike};

use crate::model::*;

/// Legend entries in display order.
pub const LEGEND: [(SlotState, &str); 3] = [
    (SlotState::Available, "Available"),
    (SlotState::Booked, "Booked"),
    (SlotState::Past, "Unavailable"),
];

const COLUMN_WIDTH: usize = 12;

/// What one grid cell shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Slot(SlotState),
    /// Outside that day's hours (e.g. Saturday afternoon).
    Closed,
}

impl Cell {
    pub fn label(&self) -> &'static str {
        match self {
            Cell::Slot(SlotState::Available) => "Available",
            Cell::Slot(SlotState::Booked) => "Booked",
            Cell::Slot(SlotState::Past) | Cell::Closed => "—",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayColumn {
    pub date: NaiveDate,
    pub day_index: DayIndex,
}

#[derive(Debug, Clone)]
pub struct WeekLayout<'a> {
    slots: &'a [Slot],
    pub days: Vec<DayColumn>,
    pub hours: Range<u32>,
}

impl<'a> WeekLayout<'a> {
    /// Columns are the distinct slot dates in slot order; rows run from the
    /// earliest opening to the latest closing hour in `business_hours`.
    pub fn new(slots: &'a [Slot], business_hours: &BusinessHours) -> Self {
        let mut days: Vec<DayColumn> = Vec::new();
        for slot in slots {
            if days.last().is_none_or(|d| d.date != slot.date) {
                days.push(DayColumn {
                    date: slot.date,
                    day_index: slot.day_index,
                });
            }
        }
        let hours = business_hours
            .hour_bounds()
            .map_or(0..0, |(open, close)| open..close);
        Self { slots, days, hours }
    }

    pub fn slot_at(&self, date: NaiveDate, hour: u32) -> Option<&'a Slot> {
        self.slots.iter().find(|s| s.date == date && s.hour == hour)
    }

    pub fn cell(&self, date: NaiveDate, hour: u32) -> Cell {
        self.slot_at(date, hour)
            .map_or(Cell::Closed, |s| Cell::Slot(s.state()))
    }

    /// `"Mon, Jan 13 - Sat, Jan 18"`; `None` for an empty grid.
    pub fn title(&self) -> Option<String> {
        let first = self.days.first()?;
        let last = self.days.last()?;
        Some(format!("{} - {}", format_day(first.date), format_day(last.date)))
    }

    /// Plain-text table of the week.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let Some(title) = self.title() else {
            out.push_str("no business hours configured\n");
            return out;
        };
        let _ = writeln!(out, "{title}");

        let _ = write!(out, "{:<9}", "Time");
        for day in &self.days {
            let _ = write!(out, "| {:<COLUMN_WIDTH$}", format_day(day.date));
        }
        out.push('\n');

        for hour in self.hours.clone() {
            let _ = write!(out, "{:<9}", format_hour(hour));
            for day in &self.days {
                let _ = write!(out, "| {:<COLUMN_WIDTH$}", self.cell(day.date, hour).label());
            }
            out.push('\n');
        }

        let legend: Vec<&str> = LEGEND.iter().map(|(_, l)| *l).collect();
        let _ = writeln!(out, "{}", legend.join(" / "));
        out
    }
}

/// `"Wed, Jan 15"`.
pub fn format_day(date: NaiveDate) -> String {
    date.format("%a, %b %-d").to_string()
}

/// `"2:00 PM"`, `"12:00 PM"`, `"12:00 AM"`.
pub fn format_hour(hour: u32) -> String {
    let (h12, meridiem) = match hour % 24 {
        0 => (12, "AM"),
        h @ 1..=11 => (h, "AM"),
        12 => (12, "PM"),
        h => (h - 12, "PM"),
    };
    format!("{h12}:00 {meridiem}")
}

/// Like [`format_hour`] but keeps the minutes.
pub fn format_time(time: Stamp) -> String {
    let hour = format_hour(time.hour());
    if time.minute() == 0 {
        return hour;
    }
    hour.replacen(":00", &format!(":{:02}", time.minute()), 1)
}
