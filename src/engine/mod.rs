mod classify;
mod error;
mod grid;
mod navigator;
#[cfg(test)]
mod tests;

pub use classify::{classify, merge_overlapping};
pub use error::NavigatorError;
pub use grid::{generate, start_of_week, week_range};
pub use navigator::{
    Applied, Epoch, FetchOutcome, FetchTicket, GridSnapshot, NavStatus, WeekNavigator,
};
