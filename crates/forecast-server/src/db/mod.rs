pub mod memory;
pub mod recorder;
pub mod schema;
pub mod sqlserver;

use std::sync::Arc;

use async_trait::async_trait;
use forecast_core::{ForecastKind, PersistedRecord, RecordId, StoreResult};

use crate::config::{DatabaseConfig, StoreBackend};
pub use memory::MemoryStore;
pub use recorder::ResultRecorder;
pub use schema::SchemaProvisioner;
pub use sqlserver::SqlServerStore;

/// Table-level operations the workflow needs from a relational store.
///
/// Every call is self-contained: implementations must not hold connections
/// or transactions open between calls.
#[async_trait]
pub trait ForecastStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn health_check(&self) -> StoreResult<()>;

    async fn table_exists(&self, kind: ForecastKind) -> StoreResult<bool>;

    /// Issue the create statement for the kind's table
    async fn create_table(&self, kind: ForecastKind) -> StoreResult<()>;

    /// Insert one row in a single statement, returning the store-assigned id
    async fn insert_record(&self, record: &PersistedRecord) -> StoreResult<RecordId>;
}

/// Build the store selected in configuration
pub fn create_store(config: &DatabaseConfig) -> Arc<dyn ForecastStore> {
    match config.backend {
        StoreBackend::SqlServer => Arc::new(SqlServerStore::new(config)),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, records will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    }
}
