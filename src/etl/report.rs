use crate::database::LoadSummary;
use crate::error::{AppError, Result};
use crate::models::{DateWindow, Feed};
use tracing::{error, info};

/// What happened to one feed during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedOutcome {
    Loaded(LoadSummary),
    /// The worksheet had no rows; nothing was deleted or inserted.
    Empty,
    Failed { reason: String },
}

impl FeedOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, FeedOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedReport {
    pub feed: Feed,
    pub outcome: FeedOutcome,
}

/// Outcomes of every feed processed in one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub window: DateWindow,
    pub feeds: Vec<FeedReport>,
}

impl RunReport {
    pub fn new(window: DateWindow) -> Self {
        Self {
            window,
            feeds: Vec::new(),
        }
    }

    /// Mark every feed as failed for a reason that prevented processing any of them.
    pub fn all_failed(window: DateWindow, feeds: &[Feed], err: &AppError) -> Self {
        let mut report = Self::new(window);
        for feed in feeds {
            error!(feed = %feed, error = %err, "Feed not processed");
            report.push(
                *feed,
                FeedOutcome::Failed {
                    reason: err.to_string(),
                },
            );
        }
        report
    }

    pub fn push(&mut self, feed: Feed, outcome: FeedOutcome) {
        self.feeds.push(FeedReport { feed, outcome });
    }

    pub fn outcome(&self, feed: Feed) -> Option<&FeedOutcome> {
        self.feeds
            .iter()
            .find(|report| report.feed == feed)
            .map(|report| &report.outcome)
    }

    pub fn failed(&self) -> impl Iterator<Item = &FeedReport> {
        self.feeds.iter().filter(|report| report.outcome.is_failed())
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }

    pub fn log_summary(&self) {
        for report in &self.feeds {
            match &report.outcome {
                FeedOutcome::Loaded(summary) => info!(
                    feed = %report.feed,
                    table = %summary.table,
                    deleted = summary.deleted,
                    inserted = summary.inserted,
                    "Loaded"
                ),
                FeedOutcome::Empty => info!(feed = %report.feed, "No rows to load"),
                FeedOutcome::Failed { reason } => {
                    error!(feed = %report.feed, reason = %reason, "Failed")
                }
            }
        }
    }

    /// `Ok` when no feed failed, otherwise a `PartialRun` error naming the failed feeds.
    pub fn into_result(self) -> Result<()> {
        let failed: Vec<String> = self.failed().map(|r| r.feed.to_string()).collect();
        match failed.is_empty() {
            true => Ok(()),
            false => Err(AppError::PartialRun { failed }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::window::test_helpers::mock_date;

    fn window() -> DateWindow {
        DateWindow::trailing(mock_date(2024, 3, 10)).unwrap()
    }

    #[test]
    fn test_successful_report() {
        let mut report = RunReport::new(window());
        report.push(Feed::MetaAds, FeedOutcome::Empty);
        report.push(
            Feed::GoogleAds,
            FeedOutcome::Loaded(LoadSummary {
                table: "dbo.google_ads".to_string(),
                window: window(),
                deleted: 3,
                inserted: 4,
                outside_window: 0,
            }),
        );

        assert!(report.is_success());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_partial_failure_names_failed_feeds() {
        let mut report = RunReport::new(window());
        report.push(
            Feed::MetaAds,
            FeedOutcome::Failed {
                reason: "boom".to_string(),
            },
        );
        report.push(Feed::GoogleAds, FeedOutcome::Empty);

        assert!(!report.is_success());
        match report.into_result().unwrap_err() {
            AppError::PartialRun { failed } => assert_eq!(failed, vec!["Meta Ads"]),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_all_failed() {
        let err = AppError::Auth("bad key".to_string());
        let report = RunReport::all_failed(window(), &Feed::ALL, &err);

        assert_eq!(report.feeds.len(), 2);
        assert!(report.feeds.iter().all(|r| r.outcome.is_failed()));
        assert_eq!(
            report.outcome(Feed::GoogleAds),
            Some(&FeedOutcome::Failed {
                reason: "OAuth2 authentication error: bad key".to_string()
            })
        );
    }
}
