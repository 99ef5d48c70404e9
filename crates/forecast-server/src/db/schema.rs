//! Table layout and lazy provisioning

use std::sync::Arc;

use forecast_core::{
    field_schema, FieldSpec, FieldType, ForecastKind, ProvisionError, ID_COLUMN, RESULT_COLUMN,
};
use serde::Serialize;

use super::ForecastStore;

/// A column of a forecast table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: String,
}

pub fn sql_type(spec: &FieldSpec) -> String {
    match spec.field_type {
        FieldType::Integer => "INT".to_string(),
        FieldType::Number | FieldType::Percentage => "FLOAT".to_string(),
        FieldType::Categorical(options) => {
            let width = options.iter().map(|o| o.chars().count()).max().unwrap_or(1);
            format!("NVARCHAR({})", width)
        }
    }
}

/// Data columns of a kind's table in insert order, result column last.
/// The identity column is not included.
pub fn data_columns(kind: ForecastKind) -> Vec<ColumnDef> {
    let mut columns: Vec<ColumnDef> = field_schema(kind)
        .iter()
        .map(|spec| ColumnDef {
            name: spec.name,
            sql_type: sql_type(spec),
        })
        .collect();
    columns.push(ColumnDef {
        name: RESULT_COLUMN,
        sql_type: "FLOAT".to_string(),
    });
    columns
}

/// Full column list including the identity column.
pub fn table_columns(kind: ForecastKind) -> Vec<ColumnDef> {
    let mut columns = vec![ColumnDef {
        name: ID_COLUMN,
        sql_type: "INT IDENTITY(1,1) PRIMARY KEY".to_string(),
    }];
    columns.extend(data_columns(kind));
    columns
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionOutcome {
    Created,
    AlreadyPresent,
}

/// Ensures each kind's table exists, creating it on first use.
#[derive(Clone)]
pub struct SchemaProvisioner {
    store: Arc<dyn ForecastStore>,
}

impl SchemaProvisioner {
    pub fn new(store: Arc<dyn ForecastStore>) -> Self {
        Self { store }
    }

    /// Idempotent: issues a create statement only when the table is absent.
    pub async fn ensure(&self, kind: ForecastKind) -> Result<ProvisionOutcome, ProvisionError> {
        let table = kind.table_name();
        let fail = |source| ProvisionError { table, source };

        if self.store.table_exists(kind).await.map_err(fail)? {
            tracing::debug!(table = %table, "Table already present");
            return Ok(ProvisionOutcome::AlreadyPresent);
        }

        self.store.create_table(kind).await.map_err(fail)?;
        tracing::info!(table = %table, kind = %kind, "Created forecast table");
        Ok(ProvisionOutcome::Created)
    }

    /// Provision every kind, reporting each outcome separately
    pub async fn ensure_all(
        &self,
    ) -> Vec<(ForecastKind, Result<ProvisionOutcome, ProvisionError>)> {
        let mut outcomes = Vec::with_capacity(ForecastKind::ALL.len());
        for kind in ForecastKind::ALL {
            outcomes.push((kind, self.ensure(kind).await));
        }
        outcomes
    }
}
