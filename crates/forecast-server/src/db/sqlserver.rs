//! SQL Server store over TDS.
//!
//! Opens a fresh connection for every call and closes it before returning.

use std::time::Instant;

use async_trait::async_trait;
use forecast_core::{
    FieldValue, ForecastKind, PersistedRecord, RecordId, StoreError, StoreResult,
};
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Query};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::schema::{data_columns, table_columns};
use super::ForecastStore;
use crate::config::DatabaseConfig;

type DbClient = Client<Compat<TcpStream>>;

pub struct SqlServerStore {
    config: Config,
}

impl SqlServerStore {
    pub fn new(config: &DatabaseConfig) -> Self {
        let mut sql_config = Config::new();
        sql_config.host(&config.host);
        sql_config.port(config.port);
        sql_config.database(&config.database);

        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            sql_config.authentication(AuthMethod::sql_server(user, password));
        }

        sql_config.encryption(EncryptionLevel::Required);
        if config.trust_cert {
            sql_config.trust_cert();
        }

        tracing::info!(
            host = %config.host,
            port = %config.port,
            database = %config.database,
            "Configured SQL Server store"
        );

        Self { config: sql_config }
    }

    async fn connect(&self) -> StoreResult<DbClient> {
        let addr = self.config.get_addr();
        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to reach {}: {}", addr, e)))?;
        tcp.set_nodelay(true)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Client::connect(self.config.clone(), tcp.compat_write())
            .await
            .map_err(classify)
    }
}

async fn close(client: DbClient) {
    if let Err(e) = client.close().await {
        tracing::debug!(error = %e, "Error closing SQL Server connection");
    }
}

/// Map a driver error onto the store taxonomy.
fn classify(err: tiberius::error::Error) -> StoreError {
    match &err {
        // 515: NULL into NOT NULL, 547: check/foreign key, 2601/2627: unique key
        tiberius::error::Error::Server(token) if matches!(token.code(), 515 | 547 | 2601 | 2627) => {
            StoreError::Constraint(err.to_string())
        }
        tiberius::error::Error::Io { .. }
        | tiberius::error::Error::Tls(_)
        | tiberius::error::Error::Routing { .. } => StoreError::Connection(err.to_string()),
        _ => StoreError::Query(err.to_string()),
    }
}

fn qualified_name(kind: ForecastKind) -> String {
    format!("dbo.{}", kind.table_name())
}

/// Conditional create statement for a kind's table.
pub fn create_table_sql(kind: ForecastKind) -> String {
    let columns = table_columns(kind)
        .iter()
        .map(|c| format!("    [{}] {}", c.name, c.sql_type))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "IF OBJECT_ID(N'{name}', N'U') IS NULL\nCREATE TABLE {name} (\n{columns}\n)",
        name = qualified_name(kind),
        columns = columns
    )
}

/// Single-row insert returning the identity value.
pub fn insert_sql(kind: ForecastKind) -> String {
    let columns = data_columns(kind);
    let names = columns
        .iter()
        .map(|c| format!("[{}]", c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("@P{}", i))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) OUTPUT inserted.[id] VALUES ({})",
        qualified_name(kind),
        names,
        placeholders
    )
}

#[async_trait]
impl ForecastStore for SqlServerStore {
    fn backend_name(&self) -> &'static str {
        "sqlserver"
    }

    async fn health_check(&self) -> StoreResult<()> {
        let mut client = self.connect().await?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(classify)?
            .into_row()
            .await
            .map_err(classify)?;
        close(client).await;
        Ok(())
    }

    async fn table_exists(&self, kind: ForecastKind) -> StoreResult<bool> {
        let mut client = self.connect().await?;

        let mut probe =
            Query::new("SELECT CASE WHEN OBJECT_ID(@P1, N'U') IS NULL THEN 0 ELSE 1 END");
        probe.bind(qualified_name(kind));

        let row = probe
            .query(&mut client)
            .await
            .map_err(classify)?
            .into_row()
            .await
            .map_err(classify)?;
        let exists = match row {
            Some(row) => row.try_get::<i32, _>(0).map_err(classify)? == Some(1),
            None => false,
        };

        close(client).await;
        tracing::debug!(table = %kind.table_name(), exists = %exists, "Probed for table");
        Ok(exists)
    }

    async fn create_table(&self, kind: ForecastKind) -> StoreResult<()> {
        let mut client = self.connect().await?;
        client
            .execute(create_table_sql(kind), &[])
            .await
            .map_err(classify)?;
        close(client).await;
        Ok(())
    }

    async fn insert_record(&self, record: &PersistedRecord) -> StoreResult<RecordId> {
        let start = Instant::now();
        let kind = record.kind();

        let mut insert = Query::new(insert_sql(kind));
        for (column, value) in record.columns() {
            match value {
                FieldValue::Integer(i) => {
                    let value = i32::try_from(i).map_err(|_| {
                        StoreError::Constraint(format!("{} out of INT range: {}", column, i))
                    })?;
                    insert.bind(value);
                }
                FieldValue::Number(n) => insert.bind(n),
                FieldValue::Text(s) => insert.bind(s),
            }
        }

        let mut client = self.connect().await?;
        let row = insert
            .query(&mut client)
            .await
            .map_err(classify)?
            .into_row()
            .await
            .map_err(classify)?
            .ok_or_else(|| StoreError::Query("No id returned from insert".to_string()))?;
        let id = row
            .try_get::<i32, _>(0)
            .map_err(classify)?
            .ok_or_else(|| StoreError::Query("Inserted id is NULL".to_string()))?;
        close(client).await;

        tracing::debug!(
            table = %kind.table_name(),
            record_id = %id,
            duration_ms = %start.elapsed().as_millis(),
            "Insert completed"
        );
        Ok(RecordId(i64::from(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_sql_is_guarded() {
        let sql = create_table_sql(ForecastKind::Supply);
        assert!(sql.starts_with("IF OBJECT_ID(N'dbo.supply_forecasting', N'U') IS NULL"));
        assert!(sql.contains("[id] INT IDENTITY(1,1) PRIMARY KEY"));
        assert!(sql.contains("[Debit_EUR] FLOAT"));
        assert!(sql.trim_end().ends_with("[Prediction_Result] FLOAT\n)"));
    }

    #[test]
    fn test_yield_ddl_types() {
        let sql = create_table_sql(ForecastKind::Yield);
        assert!(sql.contains("[Debtor] INT,"));
        assert!(sql.contains("[Revaluation_of_the_fall_] NVARCHAR(3),"));
        assert!(sql.contains("[Particle_Size__Coarse___] FLOAT,"));
    }

    #[test]
    fn test_insert_sql_placeholders() {
        let sql = insert_sql(ForecastKind::Demand);
        assert_eq!(
            sql,
            "INSERT INTO dbo.demand_forecasting ([Processing_Efficiency], [Vendor_Quality_History], \
             [Vendor_Consistency], [Credit_EUR], [Aluminum_Percentage], [Heavy_Metals_Percentage], \
             [Prediction_Result]) OUTPUT inserted.[id] VALUES (@P1, @P2, @P3, @P4, @P5, @P6, @P7)"
        );
    }

    #[test]
    fn test_classify_io_as_connection() {
        let err = tiberius::error::Error::Io {
            kind: std::io::ErrorKind::ConnectionRefused,
            message: "refused".to_string(),
        };
        assert!(matches!(classify(err), StoreError::Connection(_)));
    }
}
