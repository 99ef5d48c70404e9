use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use forecast_core::InvocationError;
use serde::Serialize;

use crate::workflow::{FailureCause, Stage, WorkflowError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required: {0}")]
    Unauthorized(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    UnknownKind(String),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
    /// Prediction obtained before a recording failure
    #[serde(skip_serializing_if = "Option::is_none")]
    prediction: Option<f64>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AppError::UnknownKind(_) => (StatusCode::NOT_FOUND, "UNKNOWN_FORECAST"),
            AppError::Workflow(e) => match &e.cause {
                FailureCause::Build(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BUILD_ERROR"),
                FailureCause::Invocation(InvocationError::Timeout) => {
                    (StatusCode::GATEWAY_TIMEOUT, "PREDICTION_TIMEOUT")
                }
                FailureCause::Invocation(InvocationError::MissingRoute(_)) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "PREDICTION_NOT_CONFIGURED")
                }
                FailureCause::Invocation(_) => (StatusCode::BAD_GATEWAY, "PREDICTION_ERROR"),
                FailureCause::Provision(_) => (StatusCode::SERVICE_UNAVAILABLE, "PROVISION_ERROR"),
                FailureCause::Persist(_) => (StatusCode::SERVICE_UNAVAILABLE, "PERSIST_ERROR"),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        match &self {
            AppError::Unauthorized(reason) => {
                tracing::info!(reason = %reason, error_code = %code, "Rejected unauthenticated request")
            }
            AppError::InvalidCredentials => {
                tracing::warn!(error_code = %code, "Login attempt with invalid credentials")
            }
            AppError::UnknownKind(kind) => {
                tracing::warn!(kind = %kind, error_code = %code, "Unknown forecast kind")
            }
            AppError::Workflow(e) if e.is_partial() => tracing::error!(
                kind = %e.kind,
                stage = %e.stage,
                error_code = %code,
                "Prediction obtained but record not persisted"
            ),
            AppError::Workflow(e) => {
                tracing::warn!(kind = %e.kind, stage = %e.stage, error_code = %code, "Submission failed")
            }
        }

        let (stage, prediction) = match &self {
            AppError::Workflow(e) => (Some(e.stage), e.prediction.map(|p| p.value)),
            _ => (None, None),
        };

        tracing::debug!(
            status_code = %status.as_u16(),
            error_code = %code,
            error_message = %self.to_string(),
            "Returning error response"
        );

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            stage,
            prediction,
        });

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
