use super::report::{FeedOutcome, RunReport};
use crate::config::EtlConfig;
use crate::database::{DatabaseOperations, TableLoader};
use crate::error::Result;
use crate::models::{DateWindow, Feed};
use crate::sheets::SheetOperations;
use indicatif::ProgressStyle;
use tracing::{Span, error, info, instrument};
use tracing_indicatif::span_ext::IndicatifSpanExt;

pub struct EtlEngine<SC, DB> {
    config: EtlConfig,
    sheets_client: SC,
    database: DB,
}

impl<SC, DB> EtlEngine<SC, DB>
where
    SC: SheetOperations + Sync,
    DB: DatabaseOperations,
{
    pub fn new(config: EtlConfig, sheets_client: SC, database: DB) -> Self {
        Self {
            config,
            sheets_client,
            database,
        }
    }

    /// Process `feeds` one after another; a failing feed never stops the next.
    #[instrument(name = "ETL", skip_all, fields(window = %window))]
    pub async fn run(&mut self, feeds: &[Feed], window: DateWindow) -> RunReport {
        let span = Span::current();
        match ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
        ) {
            Ok(style) => span.pb_set_style(&style),
            Err(e) => error!(error = %e, "Invalid progress bar template"),
        }
        span.pb_set_message("Loading feeds");
        span.pb_set_length(feeds.len() as u64);

        let mut report = RunReport::new(window);
        for feed in feeds {
            let outcome = self.process_feed(*feed, window).await;
            report.push(*feed, outcome);
            span.pb_inc(1);
        }

        report
    }

    #[instrument(name = "Processing feed", skip_all, fields(feed = %feed))]
    pub async fn process_feed(&mut self, feed: Feed, window: DateWindow) -> FeedOutcome {
        info!("Feed started");

        let outcome = match self.try_process_feed(feed, window).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Feed failed");
                FeedOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        info!("Feed finished");
        outcome
    }

    async fn try_process_feed(&mut self, feed: Feed, window: DateWindow) -> Result<FeedOutcome> {
        let feed_config = self.config.feed(feed).clone();

        let records = self.sheets_client.read_records(&feed_config.worksheet).await?;
        if records.is_empty() {
            info!("No rows to load");
            return Ok(FeedOutcome::Empty);
        }

        let loader = TableLoader::new(&feed_config.table, &self.config.date_column)?;
        let summary = loader
            .replace_window(&mut self.database, &records, window)
            .await?;

        Ok(FeedOutcome::Loaded(summary))
    }
}


#[cfg(test)]
mod tests {
    use super::mocks::MockSheetsClient;
    use super::*;
    use crate::config::FeedConfig;
    use crate::database::mocks::MockDatabase;
    use crate::database::schema::test_helpers::mock_columns;
    use crate::database::sql::SqlValue;
    use crate::models::record::test_helpers::mock_records;
    use crate::models::window::test_helpers::mock_date;

    fn etl_config() -> EtlConfig {
        EtlConfig {
            date_column: "Dia".to_string(),
            meta_ads: FeedConfig {
                worksheet: "Meta Ads".to_string(),
                table: "dbo.meta_ads".to_string(),
            },
            google_ads: FeedConfig {
                worksheet: "Google Ads".to_string(),
                table: "dbo.google_ads".to_string(),
            },
        }
    }

    fn window() -> DateWindow {
        DateWindow::trailing(mock_date(2024, 3, 10)).unwrap()
    }

    fn sheets(meta: &[&str], google: &[&str]) -> MockSheetsClient {
        let mut client = MockSheetsClient::default();
        client
            .worksheets
            .insert("Meta Ads".to_string(), mock_records(meta));
        client
            .worksheets
            .insert("Google Ads".to_string(), mock_records(google));
        client
    }

    #[tokio::test]
    async fn test_empty_sheet_issues_no_statements() {
        let db = MockDatabase::new(mock_columns(), 0);
        let mut engine = EtlEngine::new(etl_config(), sheets(&[], &[]), db.clone());

        let outcome = engine.process_feed(Feed::MetaAds, window()).await;

        assert_eq!(outcome, FeedOutcome::Empty);
        assert!(db.log().is_empty());
    }

    #[tokio::test]
    async fn test_feed_loads_window_in_one_transaction() {
        let db = MockDatabase::new(mock_columns(), 0);
        let mut engine = EtlEngine::new(
            etl_config(),
            sheets(&["2024-03-08", "2024-03-09"], &[]),
            db.clone(),
        );

        let outcome = engine.process_feed(Feed::MetaAds, window()).await;

        match outcome {
            FeedOutcome::Loaded(summary) => {
                assert_eq!(summary.table, "dbo.meta_ads");
                assert_eq!(summary.window, window());
                assert_eq!(summary.inserted, 2);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(db.log(), vec!["BEGIN", "DELETE", "INSERT", "COMMIT"]);
    }

    #[tokio::test]
    async fn test_meta_failure_does_not_stop_google() {
        let db = MockDatabase::new(mock_columns(), 0);
        let mut client = sheets(&["2024-03-09"], &["2024-03-09"]);
        client.failing.push("Meta Ads".to_string());
        let reads = client.reads.clone();
        let mut engine = EtlEngine::new(etl_config(), client, db.clone());

        let report = engine.run(&Feed::ALL, window()).await;

        assert_eq!(*reads.lock().unwrap(), vec!["Meta Ads", "Google Ads"]);
        assert!(matches!(
            report.outcome(Feed::MetaAds),
            Some(FeedOutcome::Failed { reason }) if reason.contains("403")
        ));
        assert!(matches!(
            report.outcome(Feed::GoogleAds),
            Some(FeedOutcome::Loaded(_))
        ));
        assert!(!report.is_success());
        assert_eq!(db.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_load_failure_is_reported_and_rolled_back() {
        let db = MockDatabase::new(mock_columns(), 0).failing_on("INSERT");
        let mut engine = EtlEngine::new(etl_config(), sheets(&["2024-03-09"], &[]), db.clone());

        let report = engine.run(&Feed::ALL, window()).await;

        assert!(report.outcome(Feed::MetaAds).unwrap().is_failed());
        assert_eq!(report.outcome(Feed::GoogleAds), Some(&FeedOutcome::Empty));
        assert!(db.log().contains(&"ROLLBACK".to_string()));
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let history = vec![
            SqlValue::Date(mock_date(2024, 2, 20)),
            SqlValue::Text("history".to_string()),
            SqlValue::Null,
        ];
        let db = MockDatabase::new(mock_columns(), 0).with_rows(vec![history.clone()]);
        let mut engine = EtlEngine::new(
            etl_config(),
            sheets(&["2024-03-03", "2024-03-06", "2024-03-09"], &[]),
            db.clone(),
        );

        engine.run(&[Feed::MetaAds], window()).await;
        let after_first = db.rows();
        engine.run(&[Feed::MetaAds], window()).await;
        let after_second = db.rows();

        assert_eq!(after_first, after_second);
        assert_eq!(db.rows_in(window()).len(), 3);
        assert_eq!(after_second[0], history);
    }
}
