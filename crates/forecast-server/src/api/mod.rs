pub mod dto;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session endpoints
        .route("/api/v1/login", post(handlers::login))
        .route("/api/v1/logout", post(handlers::logout))
        // Forecast endpoints
        .route("/api/v1/forecasts", get(handlers::list_forecasts))
        .route("/api/v1/forecasts/{kind}", post(handlers::submit_forecast))
        .route("/api/v1/forecasts/{kind}/preview", post(handlers::preview_forecast))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use forecast_core::{password_digest, ForecastKind, StaticCredentialVerifier};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::{DeploymentRoute, SessionConfig};
    use crate::db::MemoryStore;
    use crate::prediction::mock::MockPredictionService;
    use crate::prediction::PredictionInvoker;
    use crate::session::SessionRegistry;
    use crate::workflow::ForecastWorkflow;

    struct TestApp {
        router: Router,
        store: MemoryStore,
        service: Arc<MockPredictionService>,
    }

    fn test_app() -> TestApp {
        let store = MemoryStore::new();
        let service = Arc::new(MockPredictionService::new());
        let routes: HashMap<_, _> = ForecastKind::ALL
            .into_iter()
            .map(|kind| {
                (
                    kind,
                    DeploymentRoute {
                        deployment_id: kind.slug().to_string(),
                        deployment_token: "token".to_string(),
                    },
                )
            })
            .collect();

        let mut digests = HashMap::new();
        digests.insert("admin".to_string(), password_digest("password123"));

        let state = AppState {
            workflow: Arc::new(ForecastWorkflow::new(
                PredictionInvoker::new(service.clone(), routes),
                Arc::new(store.clone()),
            )),
            store: Arc::new(store.clone()),
            verifier: Arc::new(StaticCredentialVerifier::new(digests)),
            sessions: SessionRegistry::new(&SessionConfig {
                ttl_seconds: 60,
                max_capacity: 10,
            }),
        };

        TestApp {
            router: create_router().with_state(state),
            store,
            service,
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn login(router: &Router) -> String {
        let (status, body) = send(
            router,
            post_json(
                "/api/v1/login",
                None,
                json!({"username": "admin", "password": "password123"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["backend"], "memory");
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_login_rejects_bad_password() {
        let app = test_app();
        let (status, body) = send(
            &app.router,
            post_json(
                "/api/v1/login",
                None,
                json!({"username": "admin", "password": "nope"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_forecasts_require_session() {
        let app = test_app();
        let (status, body) = send(
            &app.router,
            post_json("/api/v1/forecasts/yield", None, json!({"use_defaults": true})),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
        assert!(app.service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_forecasts() {
        let app = test_app();
        let token = login(&app.router).await;
        let request = Request::builder()
            .uri("/api/v1/forecasts")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::OK);
        let forms = body.as_array().unwrap();
        assert_eq!(forms.len(), 3);
        assert_eq!(forms[0]["kind"], "yield");
        assert_eq!(forms[0]["fields"].as_array().unwrap().len(), 14);
        assert_eq!(forms[1]["table"], "supply_forecasting");
    }

    #[tokio::test]
    async fn test_preview_formats_without_submitting() {
        let app = test_app();
        let token = login(&app.router).await;
        let (status, body) = send(
            &app.router,
            post_json(
                "/api/v1/forecasts/supply/preview",
                Some(&token),
                json!({"fields": {"Debit_EUR": 812.346}, "use_defaults": true}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["request"]["Debit_EUR"], json!(812.346));
        let debit = body["display"]
            .as_array()
            .unwrap()
            .iter()
            .find(|f| f["name"] == "Debit_EUR")
            .unwrap();
        assert_eq!(debit["value"], "812.35");
        assert!(app.service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_submit_persists_and_reports() {
        let app = test_app();
        app.service.respond(ForecastKind::Demand, json!({"Demand____": 1234.5}));
        let token = login(&app.router).await;

        let (status, body) = send(
            &app.router,
            post_json("/api/v1/forecasts/demand", Some(&token), json!({"use_defaults": true})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stage"], "done");
        assert_eq!(body["prediction"], json!(1234.5));
        assert_eq!(body["prediction_defaulted"], json!(false));
        assert_eq!(body["response"], json!({"Demand____": 1234.5}));
        assert_eq!(body["operator"], "admin");
        assert_eq!(body["record_id"], json!(1));
        assert_eq!(app.store.row_count(ForecastKind::Demand), 1);
    }

    #[tokio::test]
    async fn test_submit_missing_fields_is_unprocessable() {
        let app = test_app();
        let token = login(&app.router).await;

        let (status, body) = send(
            &app.router,
            post_json(
                "/api/v1/forecasts/yield",
                Some(&token),
                json!({"fields": {"Debtor": 101420}}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "BUILD_ERROR");
        assert_eq!(body["stage"], "building");
    }

    #[tokio::test]
    async fn test_partial_failure_returns_prediction() {
        let app = test_app();
        app.service.respond(ForecastKind::Supply, json!({"Supply____": 7.25}));
        app.store.set_fail_inserts(true);
        let token = login(&app.router).await;

        let (status, body) = send(
            &app.router,
            post_json("/api/v1/forecasts/supply", Some(&token), json!({"use_defaults": true})),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "PERSIST_ERROR");
        assert_eq!(body["stage"], "recording");
        assert_eq!(body["prediction"], json!(7.25));
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let app = test_app();
        let token = login(&app.router).await;
        let (status, body) = send(
            &app.router,
            post_json("/api/v1/forecasts/weather", Some(&token), json!({})),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "UNKNOWN_FORECAST");
    }

    #[tokio::test]
    async fn test_logout_invalidates_token() {
        let app = test_app();
        let token = login(&app.router).await;

        let (status, body) = send(&app.router, post_json("/api/v1/logout", Some(&token), json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "admin");

        let (status, _) = send(&app.router, post_json("/api/v1/logout", Some(&token), json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
