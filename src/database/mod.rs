mod client;
pub mod loader;
pub mod schema;
pub mod sql;

pub use client::DbClient;
pub use loader::{LoadSummary, TableLoader};

use crate::error::Result;
use async_trait::async_trait;
use schema::TableColumn;
use sql::{Statement, TableName};

#[async_trait]
pub trait DatabaseOperations: Send {
    /// Columns of `table` in ordinal order; empty when the table does not exist.
    async fn table_columns(&mut self, table: &TableName) -> Result<Vec<TableColumn>>;

    async fn begin(&mut self) -> Result<()>;

    /// Run a statement and return the number of rows it affected.
    async fn execute(&mut self, statement: &Statement) -> Result<u64>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod mocks {
    use super::*;
    use crate::error::AppError;
    use super::sql::SqlValue;
    use crate::models::DateWindow;
    use std::sync::{Arc, Mutex};

    /// In-memory table that applies the loader's DELETE and INSERT statements.
    #[derive(Clone, Default)]
    pub(crate) struct MockDatabase {
        pub columns: Vec<TableColumn>,
        pub date_index: usize,
        pub rows: Arc<Mutex<Vec<Vec<SqlValue>>>>,
        pub log: Arc<Mutex<Vec<String>>>,
        /// Fail any statement whose SQL starts with this prefix; `COMMIT`
        /// fails the commit.
        pub fail_on: Option<String>,
        snapshot: Arc<Mutex<Option<Vec<Vec<SqlValue>>>>>,
    }

    impl MockDatabase {
        pub(crate) fn new(columns: Vec<TableColumn>, date_index: usize) -> Self {
            Self {
                columns,
                date_index,
                ..Default::default()
            }
        }

        pub(crate) fn failing_on(mut self, prefix: &str) -> Self {
            self.fail_on = Some(prefix.to_string());
            self
        }

        pub(crate) fn with_rows(self, rows: Vec<Vec<SqlValue>>) -> Self {
            *self.rows.lock().unwrap() = rows;
            self
        }

        pub(crate) fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        pub(crate) fn rows(&self) -> Vec<Vec<SqlValue>> {
            self.rows.lock().unwrap().clone()
        }

        pub(crate) fn rows_in(&self, window: DateWindow) -> Vec<Vec<SqlValue>> {
            let date_index = self.date_index;
            self.rows()
                .into_iter()
                .filter(|row| row[date_index].as_date().is_some_and(|d| window.contains(d)))
                .collect()
        }

        fn keyword(sql: &str) -> String {
            sql.split_whitespace().next().unwrap_or_default().to_string()
        }

        /// Apply the window DELETE the way SQL Server would: `BETWEEN` is
        /// inclusive, `>= .. AND < ..` excludes the upper bound.
        fn delete(&self, sql: &str, params: &[SqlValue]) -> u64 {
            let half_open = sql.contains(" < @P2");
            let (start, end) = match params {
                [start, end] => (start, end),
                other => panic!("unexpected DELETE params: {:?}", other),
            };
            let in_range = |value: &SqlValue| match (start, end, value) {
                (SqlValue::Date(s), SqlValue::Date(e), SqlValue::Date(d)) => s <= d && d <= e,
                (SqlValue::Text(s), SqlValue::Text(e), SqlValue::Text(d)) => s <= d && d <= e,
                (SqlValue::DateTime(s), SqlValue::DateTime(e), SqlValue::DateTime(d)) => {
                    s <= d && if half_open { d < e } else { d <= e }
                }
                (SqlValue::Date(_) | SqlValue::Text(_) | SqlValue::DateTime(_), _, _) => false,
                other => panic!("unexpected DELETE params: {:?}", other),
            };

            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|row| !in_range(&row[self.date_index]));
            (before - rows.len()) as u64
        }

        fn insert(&self, params: &[SqlValue]) -> u64 {
            let width = self.columns.len();
            let mut rows = self.rows.lock().unwrap();
            for chunk in params.chunks(width) {
                rows.push(chunk.to_vec());
            }
            (params.len() / width) as u64
        }
    }

    #[async_trait]
    impl DatabaseOperations for MockDatabase {
        async fn table_columns(&mut self, _table: &TableName) -> Result<Vec<TableColumn>> {
            Ok(self.columns.clone())
        }

        async fn begin(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("BEGIN".to_string());
            *self.snapshot.lock().unwrap() = Some(self.rows());
            Ok(())
        }

        async fn execute(&mut self, statement: &Statement) -> Result<u64> {
            let keyword = Self::keyword(&statement.sql);
            self.log.lock().unwrap().push(keyword.clone());

            if let Some(prefix) = &self.fail_on {
                if statement.sql.starts_with(prefix.as_str()) {
                    return Err(AppError::Other(anyhow::anyhow!("{} rejected", keyword)));
                }
            }

            match keyword.as_str() {
                "DELETE" => Ok(self.delete(&statement.sql, &statement.params)),
                "INSERT" => Ok(self.insert(&statement.params)),
                other => panic!("unexpected statement: {}", other),
            }
        }

        async fn commit(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("COMMIT".to_string());
            if self.fail_on.as_deref() == Some("COMMIT") {
                return Err(AppError::Other(anyhow::anyhow!("COMMIT rejected")));
            }
            *self.snapshot.lock().unwrap() = None;
            Ok(())
        }

        async fn rollback(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("ROLLBACK".to_string());
            if let Some(rows) = self.snapshot.lock().unwrap().take() {
                *self.rows.lock().unwrap() = rows;
            }
            Ok(())
        }
    }
}
