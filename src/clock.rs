use std::fmt::Display;

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::model::Stamp;

/// The one authority all wall-clock arithmetic is done in.
///
/// Slots, "now" and busy intervals are all naive local times under this
/// authority; conversion happens only at the source boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeAuthority {
    /// The host's local zone.
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl TimeAuthority {
    /// Build a fixed authority from an offset in minutes east of UTC.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(TimeAuthority::Fixed)
    }

    pub fn now(&self) -> Stamp {
        self.to_local(Utc::now().fixed_offset())
    }

    /// Absolute instant → naive wall-clock time.
    pub fn to_local(&self, instant: DateTime<FixedOffset>) -> Stamp {
        match self {
            TimeAuthority::Local => instant.with_timezone(&Local).naive_local(),
            TimeAuthority::Fixed(offset) => instant.with_timezone(offset).naive_local(),
        }
    }

    /// Midnight of an all-day date.
    pub fn start_of_date(&self, date: NaiveDate) -> Stamp {
        date.and_time(chrono::NaiveTime::MIN)
    }

    /// Naive wall-clock time → RFC 3339 with this authority's offset.
    pub fn to_rfc3339(&self, stamp: Stamp) -> String {
        match self {
            TimeAuthority::Local => rfc3339_in(&Local, stamp),
            TimeAuthority::Fixed(offset) => rfc3339_in(offset, stamp),
        }
    }
}

/// Ambiguous times take the earlier instant. A time skipped by a DST gap is
/// stepped forward an hour at a time until it exists, as a wall clock reads
/// after the jump.
fn rfc3339_in<Tz: TimeZone>(tz: &Tz, stamp: Stamp) -> String
where
    Tz::Offset: Display,
{
    (0..=2)
        .find_map(|h| tz.from_local_datetime(&(stamp + Duration::hours(h))).earliest())
        .map_or_else(|| stamp.and_utc().to_rfc3339(), |t| t.to_rfc3339())
}

/// Source of "now" for past/future tagging.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    authority: TimeAuthority,
}

impl SystemClock {
    pub fn new(authority: TimeAuthority) -> Self {
        Self { authority }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        self.authority.now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
