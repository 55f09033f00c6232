use super::SheetOperations;
use crate::config::GoogleConfig;
use crate::error::{AppError, Result};
use crate::models::RecordSet;
use crate::sheets::auth::create_and_verify_authenticator;
use async_trait::async_trait;
use google_sheets4::api::{Scope, Sheets};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use tracing::{info, instrument};

// Read and write access to spreadsheets shared with the service account
pub(crate) const AUTH_SCOPE: Scope = Scope::Spreadsheet;

// Dates as serial day numbers; formatted strings follow the sheet's locale.
const DATE_TIME_RENDER_OPTION: &str = "SERIAL_NUMBER";
const VALUE_RENDER_OPTION: &str = "UNFORMATTED_VALUE";

pub struct SheetsClient {
    hub: Sheets<HttpsConnector<HttpConnector>>,
    spreadsheet_id: String,
}

impl SheetsClient {
    /// Create a new SheetsClient with authenticated access
    #[instrument(name = "Authenticating to Google Sheets", skip_all)]
    pub async fn new(config: &GoogleConfig) -> Result<Self> {
        let auth = create_and_verify_authenticator(config).await?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| AppError::Sheets(format!("Failed to load native TLS roots: {}", e)))?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector);

        Ok(Self {
            hub: Sheets::new(client, auth),
            spreadsheet_id: config.spreadsheet_id.clone(),
        })
    }
}

/// A1 range covering a whole worksheet.
fn worksheet_range(worksheet: &str) -> String {
    format!("'{}'", worksheet.replace('\'', "''"))
}

#[async_trait]
impl SheetOperations for SheetsClient {
    #[instrument(name = "Fetching sheet", skip(self))]
    async fn read_records(&self, worksheet: &str) -> Result<RecordSet> {
        let range = worksheet_range(worksheet);
        let (_, response) = self
            .hub
            .spreadsheets()
            .values_get(&self.spreadsheet_id, &range)
            .date_time_render_option(DATE_TIME_RENDER_OPTION)
            .major_dimension("ROWS")
            .value_render_option(VALUE_RENDER_OPTION)
            .add_scope(AUTH_SCOPE)
            .doit()
            .await
            .map_err(|e| {
                AppError::Sheets(format!("Failed to read sheet '{}': {}", worksheet, e))
            })?;

        // Values are Option<Vec<Vec<serde_json::Value>>>
        let values = response.values.unwrap_or_default();
        let records = RecordSet::from_sheet_rows(&values);
        info!(rows = records.len(), "Fetched sheet");

        Ok(records)
    }
}
