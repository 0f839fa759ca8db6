use async_trait::async_trait;

use crate::model::{BusyInterval, Span};

/// Why a busy-interval fetch produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Network, auth or quota failure before a response was read.
    Unavailable(String),
    /// The calendar answered with a non-success status.
    Rejected { status: u16, message: String },
    /// The response body could not be understood.
    Malformed(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Unavailable(e) => write!(f, "calendar unavailable: {e}"),
            SourceError::Rejected { status, message } => {
                write!(f, "calendar rejected request ({status}): {message}")
            }
            SourceError::Malformed(e) => write!(f, "malformed calendar response: {e}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Capability to list busy intervals for a half-open range.
///
/// An empty list means nothing is booked; it is not a failure.
#[async_trait]
pub trait BusyIntervalSource: Send + Sync {
    async fn fetch_busy(&self, range: Span) -> Result<Vec<BusyInterval>, SourceError>;
}

/// Fixed busy list, filtered to whatever range is asked for.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    busy: Vec<BusyInterval>,
}

impl StaticSource {
    pub fn new(busy: Vec<BusyInterval>) -> Self {
        Self { busy }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BusyIntervalSource for StaticSource {
    async fn fetch_busy(&self, range: Span) -> Result<Vec<BusyInterval>, SourceError> {
        Ok(self
            .busy
            .iter()
            .filter(|b| b.overlaps(&range))
            .copied()
            .collect())
    }
}
