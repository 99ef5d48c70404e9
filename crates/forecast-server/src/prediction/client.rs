//! HTTP client for the hosted prediction API

use std::time::Duration;

use async_trait::async_trait;
use forecast_core::{InvocationError, PredictionRequest};
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};

use super::PredictionService;
use crate::config::{DeploymentRoute, PredictionConfig};

#[derive(Serialize)]
struct PredictBody<'a> {
    #[serde(rename = "queryData")]
    query_data: &'a PredictionRequest,
}

/// Calls `POST {api_url}/predict` with the deployment routing in the query string.
pub struct HttpPredictionClient {
    client: Client,
    api_url: String,
}

impl HttpPredictionClient {
    pub fn new(config: &PredictionConfig) -> Result<Self, InvocationError> {
        let mut builder = Client::builder();
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let client = builder
            .build()
            .map_err(|e| InvocationError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }
}

fn transport_error(err: reqwest::Error) -> InvocationError {
    if err.is_timeout() {
        InvocationError::Timeout
    } else {
        InvocationError::Transport(err.to_string())
    }
}

/// Unwrap the `{"success": .., "result": {..}}` envelope.
pub fn parse_envelope(body: Value) -> Result<Map<String, Value>, InvocationError> {
    let Value::Object(mut envelope) = body else {
        return Err(InvocationError::MalformedResponse(
            "response body is not a JSON object".to_string(),
        ));
    };

    if envelope.get("success").and_then(Value::as_bool) == Some(false) {
        let message = envelope
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(InvocationError::Service(message));
    }

    match envelope.remove("result") {
        Some(Value::Object(result)) => Ok(result),
        Some(other) => Err(InvocationError::MalformedResponse(format!(
            "'result' is not an object: {}",
            other
        ))),
        None => Err(InvocationError::MalformedResponse(
            "response has no 'result' field".to_string(),
        )),
    }
}

#[async_trait]
impl PredictionService for HttpPredictionClient {
    async fn predict(
        &self,
        route: &DeploymentRoute,
        request: &PredictionRequest,
    ) -> Result<Map<String, Value>, InvocationError> {
        let url = format!("{}/predict", self.api_url);

        let response = self
            .client
            .post(&url)
            .query(&[
                ("deploymentToken", route.deployment_token.as_str()),
                ("deploymentId", route.deployment_id.as_str()),
            ])
            .json(&PredictBody {
                query_data: request,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<empty response>".to_string());
            return Err(InvocationError::Rejected {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                InvocationError::Timeout
            } else {
                InvocationError::MalformedResponse(e.to_string())
            }
        })?;

        parse_envelope(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_core::{default_values, ForecastKind, RequestBuilder};
    use serde_json::json;

    #[test]
    fn test_parse_successful_envelope() {
        let result = parse_envelope(json!({"success": true, "result": {"Yield____": 0.8123}})).unwrap();
        assert_eq!(result["Yield____"], json!(0.8123));
    }

    #[test]
    fn test_parse_service_failure() {
        let err = parse_envelope(json!({"success": false, "error": "Invalid deployment token"}))
            .unwrap_err();
        assert_eq!(err, InvocationError::Service("Invalid deployment token".to_string()));
    }

    #[test]
    fn test_parse_malformed_envelopes() {
        assert!(matches!(
            parse_envelope(json!([1, 2, 3])),
            Err(InvocationError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_envelope(json!({"success": true})),
            Err(InvocationError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_envelope(json!({"success": true, "result": 0.5})),
            Err(InvocationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_body_wraps_query_data() {
        let request = RequestBuilder::new()
            .build(ForecastKind::Demand, &default_values(ForecastKind::Demand))
            .unwrap();
        let body = serde_json::to_value(PredictBody {
            query_data: &request,
        })
        .unwrap();
        assert_eq!(body["queryData"]["Credit_EUR"], json!(1000.0));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let config = PredictionConfig {
            api_url: "http://127.0.0.1:1/".to_string(),
            timeout_seconds: Some(2),
            routes: Default::default(),
        };
        let client = HttpPredictionClient::new(&config).unwrap();
        let route = DeploymentRoute {
            deployment_id: "id".to_string(),
            deployment_token: "token".to_string(),
        };
        let request = RequestBuilder::new()
            .build(ForecastKind::Supply, &default_values(ForecastKind::Supply))
            .unwrap();

        let err = client.predict(&route, &request).await.unwrap_err();
        assert!(matches!(
            err,
            InvocationError::Transport(_) | InvocationError::Timeout
        ));
    }
}
