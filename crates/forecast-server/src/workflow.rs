//! Forecast submission workflow
//!
//! One submission runs `Building → Invoking → Recording → Done`, strictly in
//! sequence. A failure at any stage ends the run with a [`WorkflowError`]
//! naming that stage. Nothing is retried and nothing is rolled back: a table
//! created before a failed insert stays, and a prediction obtained before a
//! failed insert is handed back to the caller.

use std::fmt;
use std::sync::Arc;

use forecast_core::{
    FatalBuildError, FieldValues, ForecastKind, InvocationError, PersistError,
    PredictionRequest, PredictionResult, ProvisionError, RecordId, RequestBuilder,
    SessionContext,
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::db::{ForecastStore, ResultRecorder, SchemaProvisioner};
use crate::prediction::PredictionInvoker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Building,
    Invoking,
    Recording,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Building => "building",
            Stage::Invoking => "invoking",
            Stage::Recording => "recording",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FailureCause {
    #[error(transparent)]
    Build(#[from] FatalBuildError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Terminal failure of a submission.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} submission failed while {stage}: {cause}")]
pub struct WorkflowError {
    pub kind: ForecastKind,
    pub stage: Stage,
    #[source]
    pub cause: FailureCause,
    /// Set when the prediction was obtained before the failure
    pub prediction: Option<PredictionResult>,
}

impl WorkflowError {
    fn new(kind: ForecastKind, stage: Stage, cause: impl Into<FailureCause>) -> Self {
        Self {
            kind,
            stage,
            cause: cause.into(),
            prediction: None,
        }
    }

    fn with_prediction(mut self, prediction: PredictionResult) -> Self {
        self.prediction = Some(prediction);
        self
    }

    /// The prediction succeeded but the record was not stored
    pub fn is_partial(&self) -> bool {
        self.prediction.is_some()
    }
}

/// Result of a completed submission.
#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    pub kind: ForecastKind,
    pub record_id: RecordId,
    pub prediction: PredictionResult,
    /// Result object as returned by the prediction service
    pub response: Map<String, Value>,
    pub request: PredictionRequest,
    pub operator: String,
}

pub struct ForecastWorkflow {
    builder: RequestBuilder,
    invoker: PredictionInvoker,
    provisioner: SchemaProvisioner,
    recorder: ResultRecorder,
}

impl ForecastWorkflow {
    pub fn new(invoker: PredictionInvoker, store: Arc<dyn ForecastStore>) -> Self {
        Self {
            builder: RequestBuilder::new(),
            invoker,
            provisioner: SchemaProvisioner::new(Arc::clone(&store)),
            recorder: ResultRecorder::new(store),
        }
    }

    pub fn provisioner(&self) -> &SchemaProvisioner {
        &self.provisioner
    }

    /// Build the request without sending it, for operator review
    pub fn preview(
        &self,
        kind: ForecastKind,
        values: &FieldValues,
    ) -> Result<PredictionRequest, WorkflowError> {
        self.builder
            .build(kind, values)
            .map_err(|e| WorkflowError::new(kind, Stage::Building, e))
    }

    #[tracing::instrument(
        name = "forecast",
        skip_all,
        fields(operator = %session.username, kind = %kind)
    )]
    pub async fn run(
        &self,
        session: &SessionContext,
        kind: ForecastKind,
        values: &FieldValues,
    ) -> Result<ForecastOutcome, WorkflowError> {
        let outcome = self.execute(session, kind, values).await;
        match &outcome {
            Ok(done) => tracing::info!(
                record_id = %done.record_id,
                prediction = %done.prediction.value,
                "Submission completed"
            ),
            Err(e) if e.is_partial() => {
                tracing::error!(stage = %e.stage, error = %e, "Prediction obtained but not recorded")
            }
            Err(e) => tracing::warn!(stage = %e.stage, error = %e, "Submission failed"),
        }
        outcome
    }

    async fn execute(
        &self,
        session: &SessionContext,
        kind: ForecastKind,
        values: &FieldValues,
    ) -> Result<ForecastOutcome, WorkflowError> {
        let request = self.preview(kind, values)?;
        tracing::debug!(fields = request.len(), "Request built");

        let reply = self
            .invoker
            .invoke(&request)
            .await
            .map_err(|e| WorkflowError::new(kind, Stage::Invoking, e))?;
        let prediction = reply.result;

        self.provisioner
            .ensure(kind)
            .await
            .map_err(|e| WorkflowError::new(kind, Stage::Recording, e).with_prediction(prediction))?;

        let record_id = self
            .recorder
            .record(request.clone(), prediction)
            .await
            .map_err(|e| WorkflowError::new(kind, Stage::Recording, e).with_prediction(prediction))?;

        Ok(ForecastOutcome {
            kind,
            record_id,
            prediction,
            response: reply.response,
            request,
            operator: session.username.clone(),
        })
    }
}
