use super::CredentialArgs;
use crate::error::Result;
use crate::logging;
use crate::models::{DateWindow, Feed};
use crate::sheets::{SheetOperations, SheetsClient};
use chrono::{Local, NaiveDate};
use clap::Subcommand;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum ShowResource {
    /// Show credential file paths
    Paths,
    /// Show the date window a run would replace
    Window {
        #[arg(long, value_name = "YYYY-MM-DD")]
        as_of: Option<NaiveDate>,
    },
    /// Print worksheet rows as JSON lines without touching the database
    Sheet {
        #[arg(value_enum)]
        feed: Feed,

        /// Maximum number of rows to print
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

impl ShowResource {
    pub async fn execute(&self, credentials: &CredentialArgs) -> Result<()> {
        logging::init(None)?;

        match self {
            ShowResource::Paths => show_paths(credentials),
            ShowResource::Window { as_of } => show_window(*as_of),
            ShowResource::Sheet { feed, limit } => show_sheet(credentials, *feed, *limit).await,
        }
    }
}

fn show_paths(credentials: &CredentialArgs) -> Result<()> {
    let paths = credentials.paths()?;

    info!(path = ?paths.defaults, "Shared credentials");
    info!(path = ?paths.client, client = %credentials.client, "Client credentials");

    Ok(())
}

fn show_window(as_of: Option<NaiveDate>) -> Result<()> {
    let today = as_of.unwrap_or_else(|| Local::now().date_naive());
    let window = DateWindow::trailing(today)?;

    info!(start = %window.start, end = %window.end, "Load window");

    Ok(())
}

async fn show_sheet(credentials: &CredentialArgs, feed: Feed, limit: usize) -> Result<()> {
    let config = credentials.load_config()?;
    let worksheet = &config.etl.feed(feed).worksheet;

    let client = SheetsClient::new(&config.google).await?;
    let records = client.read_records(worksheet).await?;

    for object in records.to_json_objects().into_iter().take(limit) {
        println!("{}", serde_json::to_string(&object)?);
    }
    info!(feed = %feed, rows = records.len(), headers = ?records.headers(), "Sheet fetched");

    Ok(())
}
