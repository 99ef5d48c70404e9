//! Prediction invocation
//!
//! [`PredictionInvoker`] picks the deployment route for a request's kind,
//! calls the [`PredictionService`] once and pulls the kind's scalar out of the
//! response.

pub mod client;
#[cfg(test)]
pub mod mock;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use forecast_core::{ForecastKind, InvocationError, PredictionRequest, PredictionResult};
use serde_json::{Map, Value};

use crate::config::DeploymentRoute;
pub use client::HttpPredictionClient;

/// The remote prediction capability.
#[async_trait]
pub trait PredictionService: Send + Sync {
    /// Send one request to the deployment behind `route` and return the
    /// decoded result object.
    async fn predict(
        &self,
        route: &DeploymentRoute,
        request: &PredictionRequest,
    ) -> Result<Map<String, Value>, InvocationError>;
}

/// The extracted scalar with the result object it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionReply {
    pub result: PredictionResult,
    pub response: Map<String, Value>,
}

#[derive(Clone)]
pub struct PredictionInvoker {
    service: Arc<dyn PredictionService>,
    routes: HashMap<ForecastKind, DeploymentRoute>,
}

impl PredictionInvoker {
    pub fn new(
        service: Arc<dyn PredictionService>,
        routes: HashMap<ForecastKind, DeploymentRoute>,
    ) -> Self {
        Self { service, routes }
    }

    pub fn has_route(&self, kind: ForecastKind) -> bool {
        self.routes.contains_key(&kind)
    }

    /// Call the prediction service exactly once. No retries.
    pub async fn invoke(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionReply, InvocationError> {
        let kind = request.kind();
        let route = self
            .routes
            .get(&kind)
            .ok_or(InvocationError::MissingRoute(kind))?;

        let start = Instant::now();
        tracing::debug!(
            kind = %kind,
            deployment_id = %route.deployment_id,
            "Invoking prediction service"
        );

        let response = self.service.predict(route, request).await.map_err(|e| {
            tracing::warn!(
                kind = %kind,
                deployment_id = %route.deployment_id,
                error = %e,
                duration_ms = %start.elapsed().as_millis(),
                "Prediction call failed"
            );
            e
        })?;

        let result = extract_result(kind, &response)?;
        tracing::info!(
            kind = %kind,
            deployment_id = %route.deployment_id,
            prediction = %result.value,
            defaulted = %result.defaulted,
            duration_ms = %start.elapsed().as_millis(),
            "Prediction received"
        );
        Ok(PredictionReply { result, response })
    }
}

/// Read the kind's result key. A missing or null key yields zero.
pub fn extract_result(
    kind: ForecastKind,
    response: &Map<String, Value>,
) -> Result<PredictionResult, InvocationError> {
    let key = kind.result_key();
    match response.get(key) {
        None | Some(Value::Null) => {
            tracing::warn!(
                kind = %kind,
                result_key = %key,
                returned_keys = ?response.keys().collect::<Vec<_>>(),
                "Prediction response lacks result key, defaulting to 0"
            );
            Ok(PredictionResult::defaulted())
        }
        Some(value) => value.as_f64().map(PredictionResult::returned).ok_or_else(|| {
            InvocationError::MalformedResponse(format!(
                "'{}' is not a number: {}",
                key, value
            ))
        }),
    }
}
