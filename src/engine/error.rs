#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigatorError {
    NotInitialized,
    AlreadyInitialized,
    /// Week arithmetic ran off the end of the calendar.
    OutOfRange,
}

impl std::fmt::Display for NavigatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavigatorError::NotInitialized => write!(f, "navigator not initialized"),
            NavigatorError::AlreadyInitialized => write!(f, "navigator already initialized"),
            NavigatorError::OutOfRange => write!(f, "week out of supported date range"),
        }
    }
}

impl std::error::Error for NavigatorError {}
