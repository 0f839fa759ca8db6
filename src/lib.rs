//! Weekly appointment availability: business hours crossed with calendar
//! busy intervals, navigated one week at a time.

pub mod clock;
pub mod config;
pub mod engine;
pub mod gcal;
pub mod layout;
pub mod limits;
pub mod model;
pub mod observability;
pub mod selection;
pub mod source;
pub mod watch;
