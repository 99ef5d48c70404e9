//! In-memory store.
//!
//! Keeps one table per forecast kind in process memory. Used for local
//! development (`database.backend = "memory"`) and as the store in tests,
//! where its statement counter and failure switches stand in for a real
//! database misbehaving.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use forecast_core::{
    FieldValue, ForecastKind, PersistedRecord, RecordId, StoreError, StoreResult,
};

use super::schema::data_columns;
use super::ForecastStore;

/// A row as held by the in-memory store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: RecordId,
    pub values: Vec<(&'static str, FieldValue)>,
}

impl StoredRow {
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }
}

struct MemoryTable {
    columns: Vec<&'static str>,
    rows: Vec<StoredRow>,
    next_id: i64,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<ForecastKind, MemoryTable>,
    create_statements: usize,
    fail_inserts: bool,
    unavailable: bool,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock cannot leave a half-written row,
        // so the data is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of rows in a kind's table, zero if the table does not exist
    pub fn row_count(&self, kind: ForecastKind) -> usize {
        self.state()
            .tables
            .get(&kind)
            .map(|table| table.rows.len())
            .unwrap_or(0)
    }

    pub fn rows(&self, kind: ForecastKind) -> Vec<StoredRow> {
        self.state()
            .tables
            .get(&kind)
            .map(|table| table.rows.clone())
            .unwrap_or_default()
    }

    /// Create statements issued so far
    pub fn create_statements(&self) -> usize {
        self.state().create_statements
    }

    /// Make every insert fail after validation, leaving tables untouched
    pub fn set_fail_inserts(&self, fail: bool) {
        self.state().fail_inserts = fail;
    }

    /// Make every call fail as if the server could not be reached
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }
}

fn check_available(state: &MemoryState) -> StoreResult<()> {
    if state.unavailable {
        return Err(StoreError::Connection(
            "in-memory store marked unavailable".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl ForecastStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> StoreResult<()> {
        check_available(&self.state())
    }

    async fn table_exists(&self, kind: ForecastKind) -> StoreResult<bool> {
        let state = self.state();
        check_available(&state)?;
        Ok(state.tables.contains_key(&kind))
    }

    async fn create_table(&self, kind: ForecastKind) -> StoreResult<()> {
        let mut state = self.state();
        check_available(&state)?;
        state.create_statements += 1;
        state.tables.entry(kind).or_insert_with(|| MemoryTable {
            columns: data_columns(kind).into_iter().map(|c| c.name).collect(),
            rows: Vec::new(),
            next_id: 1,
        });
        Ok(())
    }

    async fn insert_record(&self, record: &PersistedRecord) -> StoreResult<RecordId> {
        let mut state = self.state();
        check_available(&state)?;
        let fail_inserts = state.fail_inserts;

        let kind = record.kind();
        let table = state.tables.get_mut(&kind).ok_or_else(|| {
            StoreError::Query(format!("Invalid object name '{}'", kind.table_name()))
        })?;

        let values = record.columns();
        let names: Vec<&'static str> = values.iter().map(|(name, _)| *name).collect();
        if names != table.columns {
            return Err(StoreError::Constraint(format!(
                "column list {:?} does not match table '{}'",
                names,
                kind.table_name()
            )));
        }

        if fail_inserts {
            return Err(StoreError::Query("simulated write failure".to_string()));
        }

        let id = RecordId(table.next_id);
        table.next_id += 1;
        table.rows.push(StoredRow { id, values });
        Ok(id)
    }
}
