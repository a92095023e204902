//! Terminal dashboard for the forecast service.

use time::{Duration, OffsetDateTime};

use meter_client::domain::truncate_to_hour;

pub mod client;
pub mod render;

pub use client::{ClientError, ForecastClient};

pub const MIN_STEPS: usize = 1;
pub const MAX_STEPS: usize = 72;
pub const DEFAULT_STEPS: usize = 24;
pub const HISTORY_DAYS: i64 = 30;

/// History window handed to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardWindow {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl DashboardWindow {
    /// Ends one hour before `now` truncated to the hour, spans 30 days.
    pub fn ending_before(now: OffsetDateTime) -> Self {
        let end = truncate_to_hour(now) - Duration::hours(1);
        Self {
            start: end - Duration::days(HISTORY_DAYS),
            end,
        }
    }
}

pub fn validate_steps(steps: usize) -> Result<usize, String> {
    if (MIN_STEPS..=MAX_STEPS).contains(&steps) {
        Ok(steps)
    } else {
        Err(format!("steps must be between {MIN_STEPS} and {MAX_STEPS}, got {steps}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn default_window_is_thirty_days_before_the_previous_hour() {
        let w = DashboardWindow::ending_before(datetime!(2024-10-27 15:42:10 UTC));
        assert_eq!(w.end, datetime!(2024-10-27 14:00:00 UTC));
        assert_eq!(w.start, datetime!(2024-09-27 14:00:00 UTC));
    }

    #[test]
    fn steps_are_bounded() {
        assert!(validate_steps(0).is_err());
        assert_eq!(validate_steps(72), Ok(72));
        assert!(validate_steps(73).is_err());
    }
}
