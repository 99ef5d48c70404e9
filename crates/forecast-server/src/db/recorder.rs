use std::sync::Arc;
use std::time::Instant;

use forecast_core::{PersistError, PredictionRequest, PredictionResult, RecordId};

use super::ForecastStore;

/// Writes a request together with its prediction as one row.
#[derive(Clone)]
pub struct ResultRecorder {
    store: Arc<dyn ForecastStore>,
}

impl ResultRecorder {
    pub fn new(store: Arc<dyn ForecastStore>) -> Self {
        Self { store }
    }

    /// The kind's table must already exist; see [`super::SchemaProvisioner`].
    pub async fn record(
        &self,
        request: PredictionRequest,
        result: PredictionResult,
    ) -> Result<RecordId, PersistError> {
        let start = Instant::now();
        let kind = request.kind();
        let table = kind.table_name();
        let record = request.into_record(result);

        tracing::debug!(table = %table, columns = record.columns().len(), "Inserting forecast record");

        let id = self
            .store
            .insert_record(&record)
            .await
            .map_err(|source| PersistError { table, source })?;

        tracing::info!(
            table = %table,
            record_id = %id,
            prediction = %result.value,
            duration_ms = %start.elapsed().as_millis(),
            "Forecast record persisted"
        );
        Ok(id)
    }
}
