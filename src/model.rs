use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Wall-clock time under the single local time authority.
pub type Stamp = NaiveDateTime;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Stamp,
    pub end: Stamp,
}

impl Span {
    pub fn new(start: Stamp, end: Stamp) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// `None` unless `start < end`. Used at the source boundary where input is untrusted.
    pub fn checked(start: Stamp, end: Stamp) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

}

/// A range reported as occupied by an external calendar. Opaque beyond overlap tests.
pub type BusyInterval = Span;

/// Length of every bookable slot.
pub fn slot_length() -> Duration {
    Duration::hours(1)
}

// ── Business hours ───────────────────────────────────────────────

/// Weekday index, 0 = Monday.
pub type DayIndex = u8;

pub const SUNDAY: DayIndex = 6;

/// Operating window `[open_hour, close_hour)` for one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub open_hour: u32,
    pub close_hour: u32,
}

impl DayHours {
    pub const fn new(open_hour: u32, close_hour: u32) -> Self {
        Self { open_hour, close_hour }
    }

    /// Open hours for slot generation, clamped to the 24-hour day.
    /// Empty when `open_hour >= close_hour`.
    pub fn hours(&self) -> std::ops::Range<u32> {
        self.open_hour.min(24)..self.close_hour.min(24)
    }

    pub fn is_degenerate(&self) -> bool {
        self.open_hour >= self.close_hour
    }
}

/// Weekly business hours keyed by weekday index, iterated in ascending day order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusinessHours {
    days: BTreeMap<DayIndex, DayHours>,
}

impl BusinessHours {
    pub fn new(days: impl IntoIterator<Item = (DayIndex, DayHours)>) -> Self {
        Self {
            days: days.into_iter().collect(),
        }
    }

    /// Mon–Fri 8–18, Sat 8–14.
    pub fn reference() -> Self {
        let mut days: Vec<(DayIndex, DayHours)> =
            (0..5).map(|d| (d, DayHours::new(8, 18))).collect();
        days.push((5, DayHours::new(8, 14)));
        Self::new(days)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DayIndex, DayHours)> + '_ {
        self.days.iter().map(|(d, h)| (*d, *h))
    }

    pub fn get(&self, day: DayIndex) -> Option<DayHours> {
        self.days.get(&day).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Days configured with `open_hour >= close_hour`; they produce no slots.
    pub fn degenerate_days(&self) -> Vec<DayIndex> {
        self.iter()
            .filter(|(_, h)| h.is_degenerate())
            .map(|(d, _)| d)
            .collect()
    }

    /// Total slots per week: Σ (close - open) over well-formed days.
    pub fn slots_per_week(&self) -> usize {
        self.iter().map(|(_, h)| h.hours().len()).sum()
    }

    /// Earliest opening and latest closing hour across the week.
    pub fn hour_bounds(&self) -> Option<(u32, u32)> {
        let mut open = self.iter().filter(|(_, h)| !h.is_degenerate());
        let (_, first) = open.next()?;
        let bounds = open.fold(first.hours(), |acc, (_, h)| {
            let r = h.hours();
            acc.start.min(r.start)..acc.end.max(r.end)
        });
        Some((bounds.start, bounds.end))
    }
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self::reference()
    }
}

// ── Slots ────────────────────────────────────────────────────────

/// How a slot must be presented. Mutually exclusive; `Past` wins over `Booked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    Available,
    Booked,
    Past,
}

/// One hour-long candidate appointment window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub hour: u32,
    pub time: Stamp,
    pub day_index: DayIndex,
    pub is_past: bool,
    pub is_booked: bool,
}

impl Slot {
    pub fn span(&self) -> Span {
        Span::new(self.time, self.time + slot_length())
    }

    pub fn state(&self) -> SlotState {
        if self.is_past {
            SlotState::Past
        } else if self.is_booked {
            SlotState::Booked
        } else {
            SlotState::Available
        }
    }

    pub fn is_eligible(&self) -> bool {
        !self.is_past && !self.is_booked
    }
}

/// Navigation step of exactly one week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

impl Direction {
    pub fn days(self) -> i64 {
        match self {
            Direction::Previous => -7,
            Direction::Next => 7,
        }
    }
}
