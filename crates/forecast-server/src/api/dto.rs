use forecast_core::{
    field_schema, FieldSpec, FieldValues, ForecastKind, PredictionRequest, RecordId,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::workflow::{ForecastOutcome, Stage};

// ============================================================================
// GET /health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
    pub database: String,
}

// ============================================================================
// POST /api/v1/login, POST /api/v1/logout
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub expires_in_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub status: String,
    pub username: String,
}

// ============================================================================
// GET /api/v1/forecasts
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ForecastForm {
    pub kind: ForecastKind,
    pub label: &'static str,
    pub table: &'static str,
    pub result_key: &'static str,
    pub fields: &'static [FieldSpec],
}

impl From<ForecastKind> for ForecastForm {
    fn from(kind: ForecastKind) -> Self {
        Self {
            kind,
            label: kind.label(),
            table: kind.table_name(),
            result_key: kind.result_key(),
            fields: field_schema(kind),
        }
    }
}

// ============================================================================
// POST /api/v1/forecasts/{kind}[/preview]
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SubmissionRequest {
    #[serde(default)]
    pub fields: FieldValues,
    /// Fill absent fields with the form defaults
    #[serde(default)]
    pub use_defaults: bool,
}

#[derive(Debug, Serialize)]
pub struct DisplayField {
    pub name: &'static str,
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub kind: ForecastKind,
    pub request: PredictionRequest,
    pub display: Vec<DisplayField>,
}

impl From<PredictionRequest> for PreviewResponse {
    fn from(request: PredictionRequest) -> Self {
        let display = field_schema(request.kind())
            .iter()
            .filter_map(|spec| {
                request.get(spec.name).map(|value| DisplayField {
                    name: spec.name,
                    label: spec.label,
                    value: spec.display(value),
                })
            })
            .collect();

        Self {
            kind: request.kind(),
            request,
            display,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub kind: ForecastKind,
    pub stage: Stage,
    pub record_id: RecordId,
    pub table: &'static str,
    pub prediction: f64,
    pub prediction_defaulted: bool,
    /// Full result object from the prediction service
    pub response: Map<String, Value>,
    pub operator: String,
    pub request: PredictionRequest,
}

impl From<ForecastOutcome> for SubmissionResponse {
    fn from(outcome: ForecastOutcome) -> Self {
        Self {
            kind: outcome.kind,
            stage: Stage::Done,
            record_id: outcome.record_id,
            table: outcome.kind.table_name(),
            prediction: outcome.prediction.value,
            prediction_defaulted: outcome.prediction.defaulted,
            response: outcome.response,
            operator: outcome.operator,
            request: outcome.request,
        }
    }
}
