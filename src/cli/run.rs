use super::CredentialArgs;
use crate::database::DbClient;
use crate::error::Result;
use crate::etl::{EtlEngine, RunReport};
use crate::logging;
use crate::models::{DateWindow, Feed};
use crate::sheets::SheetsClient;
use chrono::{Local, NaiveDate};
use tracing::info;

pub async fn execute(
    credentials: &CredentialArgs,
    as_of: Option<NaiveDate>,
    feeds: &[Feed],
) -> Result<()> {
    let config = credentials.load_config()?;
    logging::init(Some(config.log_path()))?;
    info!(client = %config.client, "Run started");

    let today = as_of.unwrap_or_else(|| Local::now().date_naive());
    let window = DateWindow::trailing(today)?;
    let feeds = selected_feeds(feeds);

    // No per-feed isolation here: without a connection nothing can load.
    let database = DbClient::connect(&config.database).await?;

    let report = match SheetsClient::new(&config.google).await {
        Ok(sheets_client) => {
            let mut engine = EtlEngine::new(config.etl.clone(), sheets_client, database);
            engine.run(&feeds, window).await
        }
        Err(e) => RunReport::all_failed(window, &feeds, &e),
    };

    report.log_summary();
    info!(window = %window, "Run finished");

    report.into_result()
}

/// Requested feeds in run order, or every feed when none were requested.
fn selected_feeds(requested: &[Feed]) -> Vec<Feed> {
    if requested.is_empty() {
        return Feed::ALL.to_vec();
    }
    Feed::ALL
        .into_iter()
        .filter(|feed| requested.contains(feed))
        .collect()
}
