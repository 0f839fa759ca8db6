/// Page size requested from the calendar; a week never needs more.
pub const MAX_BUSY_INTERVALS: usize = 2500;

/// Per-request timeout for the calendar adapter.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Refresh interval floor for the watch loop.
pub const MIN_REFRESH_SECS: u64 = 5;

pub const DEFAULT_REFRESH_SECS: u64 = 300;

/// How far `SLOTWISE_WEEK_OFFSET` may move the starting week, either way.
pub const MAX_WEEK_OFFSET: i32 = 520;
