//! Error taxonomy for the forecast workflow
//!
//! Each stage of a submission has its own error type so callers can tell
//! where a failure happened and whether anything was left behind.

use thiserror::Error;

use crate::models::ForecastKind;

/// Low-level store failure, shared by provisioning and recording.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// The backing table for a kind could not be ensured.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to provision table `{table}`: {source}")]
pub struct ProvisionError {
    pub table: &'static str,
    #[source]
    pub source: StoreError,
}

/// A request could not be built from the supplied field values.
///
/// A conformant caller never triggers this; it signals a contract violation
/// between the surface and the workflow rather than a recoverable user error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FatalBuildError {
    #[error("Missing required field `{field}` for {kind} request")]
    MissingField {
        kind: ForecastKind,
        field: &'static str,
    },

    #[error("Invalid value for `{field}` in {kind} request: expected {expected}, got {found}")]
    InvalidValue {
        kind: ForecastKind,
        field: &'static str,
        expected: String,
        found: String,
    },
}

/// The remote prediction call failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvocationError {
    #[error("No prediction route configured for {0}")]
    MissingRoute(ForecastKind),

    #[error("Prediction service unreachable: {0}")]
    Transport(String),

    #[error("Prediction request timed out")]
    Timeout,

    #[error("Prediction service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Prediction service reported a failure: {0}")]
    Service(String),

    #[error("Malformed prediction response: {0}")]
    MalformedResponse(String),
}

/// The combined request/result row could not be written.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to persist record into `{table}`: {source}")]
pub struct PersistError {
    pub table: &'static str,
    #[source]
    pub source: StoreError,
}

pub type StoreResult<T> = Result<T, StoreError>;
