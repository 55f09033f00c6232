use super::DatabaseOperations;
use super::schema::TableSchema;
use super::sql::{Statement, TableName, delete_window_statement, insert_statements};
use crate::error::Result;
use crate::models::{DateWindow, RecordSet};
use tracing::{debug, info, instrument, warn};

/// Result of replacing one window of a destination table.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub table: String,
    pub window: DateWindow,
    pub deleted: u64,
    pub inserted: u64,
    /// Rows inserted although their date lies outside the window.
    pub outside_window: usize,
}

pub struct TableLoader {
    table: TableName,
    date_column: String,
}

impl TableLoader {
    pub fn new(table: &str, date_column: &str) -> Result<Self> {
        Ok(Self {
            table: TableName::parse(table)?,
            date_column: date_column.to_string(),
        })
    }

    /// Delete the window's rows and insert `records` in one transaction.
    ///
    /// Records are validated against the table schema first, so a mismatch
    /// leaves the table untouched.
    #[instrument(name = "Loading table", skip_all, fields(table = %self.table, window = %window))]
    pub async fn replace_window<DB>(
        &self,
        db: &mut DB,
        records: &RecordSet,
        window: DateWindow,
    ) -> Result<LoadSummary>
    where
        DB: DatabaseOperations,
    {
        let columns = db.table_columns(&self.table).await?;
        let schema = TableSchema::new(&self.table.to_string(), columns)?;
        let bound = schema.bind(records, &self.date_column)?;

        let outside_window = bound.count_outside(window);
        if outside_window > 0 {
            warn!(rows = outside_window, "Rows dated outside the load window");
        }

        let delete =
            delete_window_statement(&self.table, &self.date_column, bound.date_kind, window)?;
        let inserts = insert_statements(&self.table, &bound.columns, &bound.rows);
        debug!(statements = inserts.len(), rows = bound.len(), "Prepared inserts");

        db.begin().await?;
        match Self::apply(db, &delete, &inserts).await {
            Ok((deleted, inserted)) => {
                info!(deleted, inserted, "Window replaced");

                Ok(LoadSummary {
                    table: self.table.to_string(),
                    window,
                    deleted,
                    inserted,
                    outside_window,
                })
            }
            Err(e) => {
                // The connection is shared by later feeds, so no transaction
                // may stay open past this point.
                if let Err(rollback_err) = db.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Run the statements and commit. Any error, the commit's included, leaves
    /// the transaction for the caller to roll back.
    async fn apply<DB>(db: &mut DB, delete: &Statement, inserts: &[Statement]) -> Result<(u64, u64)>
    where
        DB: DatabaseOperations,
    {
        let deleted = db.execute(delete).await?;

        let mut inserted = 0;
        for statement in inserts {
            inserted += db.execute(statement).await?;
        }

        db.commit().await?;

        Ok((deleted, inserted))
    }
}
