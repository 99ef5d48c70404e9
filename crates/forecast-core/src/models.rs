//! Forecast data models
//!
//! A submission moves through these types in order: raw [`FieldValues`] from
//! the operator, a [`PredictionRequest`] built against the kind's schema, a
//! [`PredictionResult`] from the remote service, and finally a
//! [`PersistedRecord`] that becomes one row in the kind's table.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Column that carries the prediction in every forecast table.
pub const RESULT_COLUMN: &str = "Prediction_Result";

/// Identity column assigned by the store.
pub const ID_COLUMN: &str = "id";

// =============================================================================
// Forecast Kind
// =============================================================================

/// The three forecasts an operator can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastKind {
    Yield,
    Supply,
    Demand,
}

impl ForecastKind {
    pub const ALL: [ForecastKind; 3] = [
        ForecastKind::Yield,
        ForecastKind::Supply,
        ForecastKind::Demand,
    ];

    /// Table holding this kind's submissions
    pub fn table_name(&self) -> &'static str {
        match self {
            ForecastKind::Yield => "yield_prediction",
            ForecastKind::Supply => "supply_forecasting",
            ForecastKind::Demand => "demand_forecasting",
        }
    }

    /// Key under which the prediction service returns the scalar
    pub fn result_key(&self) -> &'static str {
        match self {
            ForecastKind::Yield => "Yield____",
            ForecastKind::Supply => "Supply____",
            ForecastKind::Demand => "Demand____",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ForecastKind::Yield => "Yield Prediction",
            ForecastKind::Supply => "Supply Forecasting",
            ForecastKind::Demand => "Demand Forecasting",
        }
    }

    /// Lowercase identifier used in URLs and configuration keys
    pub fn slug(&self) -> &'static str {
        match self {
            ForecastKind::Yield => "yield",
            ForecastKind::Supply => "supply",
            ForecastKind::Demand => "demand",
        }
    }
}

impl fmt::Display for ForecastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ForecastKind::Yield => "Yield",
            ForecastKind::Supply => "Supply",
            ForecastKind::Demand => "Demand",
        };
        f.write_str(name)
    }
}

impl FromStr for ForecastKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yield" => Ok(ForecastKind::Yield),
            "supply" => Ok(ForecastKind::Supply),
            "demand" => Ok(ForecastKind::Demand),
            other => Err(format!(
                "Unknown forecast kind '{}'. Valid: yield, supply, demand",
                other
            )),
        }
    }
}

// =============================================================================
// Field Values
// =============================================================================

/// A single value as supplied by the operator or stored in a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Integer(_) => "integer",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// Raw field values keyed by field name, as collected from the operator.
pub type FieldValues = HashMap<String, FieldValue>;

// =============================================================================
// Request / Result / Record
// =============================================================================

/// A fully populated request for one forecast kind.
///
/// Fields appear in schema order and there is exactly one entry per schema
/// field. Only [`crate::RequestBuilder`] constructs these.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    kind: ForecastKind,
    fields: Vec<(&'static str, FieldValue)>,
}

impl PredictionRequest {
    pub(crate) fn new(kind: ForecastKind, fields: Vec<(&'static str, FieldValue)>) -> Self {
        Self { kind, fields }
    }

    pub fn kind(&self) -> ForecastKind {
        self.kind
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(name, _)| *name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Append the prediction, producing the row to persist.
    pub fn into_record(self, result: PredictionResult) -> PersistedRecord {
        PersistedRecord {
            request: self,
            result,
        }
    }
}

impl Serialize for PredictionRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Scalar returned by the prediction service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub value: f64,
    /// True when the response lacked the result key and the value fell back to zero
    pub defaulted: bool,
}

impl PredictionResult {
    pub fn returned(value: f64) -> Self {
        Self {
            value,
            defaulted: false,
        }
    }

    pub fn defaulted() -> Self {
        Self {
            value: 0.0,
            defaulted: true,
        }
    }
}

/// Store-assigned row identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request plus result, written as a single row.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedRecord {
    request: PredictionRequest,
    result: PredictionResult,
}

impl PersistedRecord {
    pub fn kind(&self) -> ForecastKind {
        self.request.kind
    }

    pub fn request(&self) -> &PredictionRequest {
        &self.request
    }

    pub fn result(&self) -> PredictionResult {
        self.result
    }

    /// Column/value pairs in insert order, ending with the result column.
    pub fn columns(&self) -> Vec<(&'static str, FieldValue)> {
        let mut columns: Vec<(&'static str, FieldValue)> = self
            .request
            .fields
            .iter()
            .map(|(name, value)| (*name, value.clone()))
            .collect();
        columns.push((RESULT_COLUMN, FieldValue::Number(self.result.value)));
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> PredictionRequest {
        PredictionRequest::new(
            ForecastKind::Demand,
            vec![
                ("Processing_Efficiency", FieldValue::Number(80.0)),
                ("Credit_EUR", FieldValue::Number(1000.0)),
            ],
        )
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Yield".parse::<ForecastKind>(), Ok(ForecastKind::Yield));
        assert_eq!(" supply ".parse::<ForecastKind>(), Ok(ForecastKind::Supply));
        assert_eq!("DEMAND".parse::<ForecastKind>(), Ok(ForecastKind::Demand));
        assert!("weather".parse::<ForecastKind>().is_err());
    }

    #[test]
    fn test_kind_routing_names() {
        assert_eq!(ForecastKind::Yield.table_name(), "yield_prediction");
        assert_eq!(ForecastKind::Supply.result_key(), "Supply____");
        assert_eq!(ForecastKind::Demand.slug(), "demand");
    }

    #[test]
    fn test_field_value_untagged_deserialization() {
        let values: FieldValues = serde_json::from_str(
            r#"{"Debtor": 101420, "Aluminum____": 0.94677069, "Revaluation_of_the_fall_": "Yes"}"#,
        )
        .unwrap();

        assert_eq!(values["Debtor"], FieldValue::Integer(101420));
        assert_eq!(values["Aluminum____"], FieldValue::Number(0.94677069));
        assert_eq!(values["Revaluation_of_the_fall_"], FieldValue::Text("Yes".into()));
    }

    #[test]
    fn test_request_serializes_in_field_order() {
        let json = serde_json::to_string(&sample_request()).unwrap();
        assert_eq!(json, r#"{"Processing_Efficiency":80.0,"Credit_EUR":1000.0}"#);
    }

    #[test]
    fn test_record_appends_result_column_last() {
        let record = sample_request().into_record(PredictionResult::returned(0.42));
        let columns = record.columns();

        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].0, "Processing_Efficiency");
        assert_eq!(columns[2], (RESULT_COLUMN, FieldValue::Number(0.42)));
        assert_eq!(record.kind(), ForecastKind::Demand);
    }

    #[test]
    fn test_defaulted_result_is_zero() {
        let result = PredictionResult::defaulted();
        assert_eq!(result.value, 0.0);
        assert!(result.defaulted);
    }
}
