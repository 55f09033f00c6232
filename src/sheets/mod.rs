mod auth;
mod client;

pub use client::SheetsClient;

use crate::error::Result;
use crate::models::RecordSet;
use async_trait::async_trait;

#[async_trait]
pub trait SheetOperations {
    /// Fetch every row of `worksheet`, first row as headers.
    async fn read_records(&self, worksheet: &str) -> Result<RecordSet>;
}
