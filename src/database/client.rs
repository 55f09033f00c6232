use super::DatabaseOperations;
use super::schema::{ColumnType, TableColumn};
use super::sql::{SqlValue, Statement, TableName};
use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tiberius::numeric::Numeric;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Query, SqlBrowser};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, instrument};

const APPLICATION_NAME: &str = "ads-sheet-etl";

const COLUMNS_QUERY: &str = "\
SELECT COLUMN_NAME, DATA_TYPE, IS_NULLABLE
FROM INFORMATION_SCHEMA.COLUMNS
WHERE TABLE_NAME = @P1 AND (@P2 IS NULL OR TABLE_SCHEMA = @P2)
ORDER BY ORDINAL_POSITION";

/// A single SQL Server connection shared by every feed of a run.
pub struct DbClient {
    client: Client<Compat<TcpStream>>,
}

impl DbClient {
    /// Connect and log in, failing if both together take longer than the
    /// configured connect timeout.
    #[instrument(name = "Connecting to SQL Server", skip_all, fields(host = %config.host, database = %config.database))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let tds_config = Self::tds_config(config);

        let client = timeout(config.connect_timeout, Self::open(tds_config, config))
            .await
            .map_err(|_| {
                AppError::Connect(format!(
                    "Timed out after {}s connecting to {}",
                    config.connect_timeout.as_secs(),
                    config.host
                ))
            })??;

        info!("Database connection established");

        Ok(Self { client })
    }

    fn tds_config(config: &DatabaseConfig) -> Config {
        let mut tds = Config::new();
        tds.host(&config.host);
        if let Some(port) = config.port {
            tds.port(port);
        }
        if let Some(instance) = &config.instance {
            tds.instance_name(instance);
        }
        tds.database(&config.database);
        tds.application_name(APPLICATION_NAME);
        tds.authentication(AuthMethod::sql_server(&config.username, &config.password));
        tds.encryption(EncryptionLevel::Required);
        if config.trust_server_certificate {
            tds.trust_cert();
        }
        tds
    }

    async fn open(tds: Config, config: &DatabaseConfig) -> Result<Client<Compat<TcpStream>>> {
        let tcp = match config.instance {
            Some(_) => TcpStream::connect_named(&tds).await?,
            None => TcpStream::connect(tds.get_addr())
                .await
                .map_err(|e| AppError::Connect(format!("Failed to reach {}: {}", tds.get_addr(), e)))?,
        };
        tcp.set_nodelay(true)?;

        let client = Client::connect(tds, tcp.compat_write()).await?;
        Ok(client)
    }

    fn bind<'a>(query: &mut Query<'a>, value: &'a SqlValue) {
        match value {
            SqlValue::Null => query.bind(Option::<&str>::None),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Int(n) => query.bind(*n),
            SqlValue::Float(n) => query.bind(*n),
            SqlValue::Decimal(d) => query.bind(to_numeric(d)),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Date(d) => query.bind(*d),
            SqlValue::DateTime(dt) => query.bind(*dt),
        }
    }

    async fn simple(&mut self, sql: &str) -> Result<()> {
        self.client.simple_query(sql).await?.into_results().await?;
        Ok(())
    }
}

/// `Decimal` only implements `ToSql`, so parameters go through `Numeric`.
fn to_numeric(value: &Decimal) -> Numeric {
    Numeric::new_with_scale(value.mantissa(), value.scale() as u8)
}

#[async_trait]
impl DatabaseOperations for DbClient {
    #[instrument(name = "Reading table schema", skip(self))]
    async fn table_columns(&mut self, table: &TableName) -> Result<Vec<TableColumn>> {
        let mut query = Query::new(COLUMNS_QUERY);
        query.bind(table.name.as_str());
        query.bind(table.schema.as_deref());

        let rows = query
            .query(&mut self.client)
            .await?
            .into_first_result()
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: &str = row.try_get(0)?.unwrap_or_default();
            let data_type: &str = row.try_get(1)?.unwrap_or_default();
            let nullable: &str = row.try_get(2)?.unwrap_or("YES");
            columns.push(TableColumn::new(
                name,
                ColumnType::from_sql_type(data_type),
                nullable.eq_ignore_ascii_case("YES"),
            ));
        }
        debug!(columns = columns.len(), "Read table schema");

        Ok(columns)
    }

    async fn begin(&mut self) -> Result<()> {
        self.simple("BEGIN TRANSACTION").await
    }

    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        let mut query = Query::new(statement.sql.as_str());
        for value in &statement.params {
            Self::bind(&mut query, value);
        }

        let result = query.execute(&mut self.client).await?;
        Ok(result.total())
    }

    async fn commit(&mut self) -> Result<()> {
        self.simple("COMMIT TRANSACTION").await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.simple("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::dec;

    #[test]
    fn test_to_numeric_keeps_scale() {
        let numeric = to_numeric(&dec!(1234.50));
        assert_eq!(numeric.value(), 123450);
        assert_eq!(numeric.scale(), 2);

        let negative = to_numeric(&dec!(-0.007));
        assert_eq!(negative.value(), -7);
        assert_eq!(negative.scale(), 3);

        let whole = to_numeric(&dec!(42));
        assert_eq!(whole.value(), 42);
        assert_eq!(whole.scale(), 0);
    }
}
