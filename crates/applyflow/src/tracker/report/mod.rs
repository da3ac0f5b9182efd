//! Pure aggregations over a user's tracker records.
//!
//! Every function here is total: empty input yields zeroed summaries and no
//! division can fail. Fetching and date-range scoping happen before these run.

pub mod calendar;
pub mod stats;
pub mod trends;
pub mod views;

pub use calendar::{classify, events_from, group_by_period, month_grid, today_action_items};
pub use stats::{dashboard_stats, status_board};
pub use trends::analytics_report;

/// `part` as a percentage of `total`, or 0 when there is nothing to divide.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
