//! Scripted prediction service for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use forecast_core::{ForecastKind, InvocationError, PredictionRequest};
use serde_json::{Map, Value};

use super::PredictionService;
use crate::config::DeploymentRoute;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: ForecastKind,
    pub deployment_id: String,
    pub deployment_token: String,
    pub query: Value,
}

#[derive(Clone)]
enum Reply {
    Respond(Map<String, Value>),
    Fail(InvocationError),
}

#[derive(Default)]
pub struct MockPredictionService {
    replies: Mutex<HashMap<ForecastKind, Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockPredictionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to `kind` with the given JSON object
    pub fn respond(&self, kind: ForecastKind, response: Value) {
        let map = response.as_object().cloned().unwrap_or_default();
        self.replies.lock().unwrap().insert(kind, Reply::Respond(map));
    }

    pub fn fail(&self, kind: ForecastKind, error: InvocationError) {
        self.replies.lock().unwrap().insert(kind, Reply::Fail(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PredictionService for MockPredictionService {
    async fn predict(
        &self,
        route: &DeploymentRoute,
        request: &PredictionRequest,
    ) -> Result<Map<String, Value>, InvocationError> {
        let kind = request.kind();
        self.calls.lock().unwrap().push(RecordedCall {
            kind,
            deployment_id: route.deployment_id.clone(),
            deployment_token: route.deployment_token.clone(),
            query: serde_json::to_value(request).unwrap(),
        });

        // Let concurrent submissions interleave
        tokio::task::yield_now().await;

        let reply = self.replies.lock().unwrap().get(&kind).cloned();
        match reply {
            Some(Reply::Respond(map)) => Ok(map),
            Some(Reply::Fail(error)) => Err(error),
            None => Ok(Map::new()),
        }
    }
}
