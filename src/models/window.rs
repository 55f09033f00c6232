use crate::error::{AppError, Result};
use chrono::{Days, NaiveDate};
use std::fmt;

/// Number of days covered by a load window, ending yesterday.
pub const WINDOW_DAYS: u64 = 7;

/// Inclusive range of calendar dates scoping the delete of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// The trailing week ending the day before `today`.
    pub fn trailing(today: NaiveDate) -> Result<Self> {
        let end = today
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| AppError::Config(format!("Failed to calculate window end from {}", today)))?;
        let start = end
            .checked_sub_days(Days::new(WINDOW_DAYS - 1))
            .ok_or_else(|| AppError::Config(format!("Failed to calculate window start from {}", end)))?;

        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..={}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}


#[cfg(test)]
mod tests {
    use super::test_helpers::mock_date;
    use super::*;

    #[test]
    fn test_trailing_window() {
        let window = DateWindow::trailing(mock_date(2024, 3, 10)).unwrap();

        assert_eq!(window.start, mock_date(2024, 3, 3));
        assert_eq!(window.end, mock_date(2024, 3, 9));
        assert_eq!(window.to_string(), "2024-03-03..=2024-03-09");
    }

    #[test]
    fn test_trailing_window_spans_month_boundary() {
        let window = DateWindow::trailing(mock_date(2024, 3, 2)).unwrap();

        assert_eq!(window.start, mock_date(2024, 2, 24));
        assert_eq!(window.end, mock_date(2024, 3, 1));
    }

    #[test]
    fn test_window_is_seven_days_inclusive() {
        let window = DateWindow::trailing(mock_date(2025, 1, 1)).unwrap();
        let span = window.end.signed_duration_since(window.start).num_days() + 1;

        assert_eq!(span, WINDOW_DAYS as i64);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let window = DateWindow::trailing(mock_date(2024, 3, 10)).unwrap();

        assert!(window.contains(mock_date(2024, 3, 3)));
        assert!(window.contains(mock_date(2024, 3, 9)));
        assert!(!window.contains(mock_date(2024, 3, 2)));
        assert!(!window.contains(mock_date(2024, 3, 10)));
    }
}
