use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use forecast_core::{with_defaults, Credentials, ForecastKind, SessionContext};
use std::time::Instant;

use super::dto::*;
use crate::error::{AppError, AppResult};
use crate::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn require_session(state: &AppState, headers: &HeaderMap) -> AppResult<(String, SessionContext)> {
    let token = bearer_token(headers)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
    let session = state
        .sessions
        .get(token)
        .await
        .ok_or_else(|| AppError::Unauthorized("session expired or unknown".to_string()))?;
    Ok((token.to_string(), session))
}

fn parse_kind(raw: &str) -> AppResult<ForecastKind> {
    raw.parse::<ForecastKind>().map_err(AppError::UnknownKind)
}

pub async fn health_check(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let db_status = match state.store.health_check().await {
        Ok(_) => {
            tracing::debug!("Store health check passed");
            "connected"
        }
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            "disconnected"
        }
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.store.backend_name().to_string(),
        database: db_status.to_string(),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> AppResult<Json<LoginResponse>> {
    tracing::info!(username = %credentials.username, "Processing login request");

    if !state.verifier.authenticate(&credentials) {
        return Err(AppError::InvalidCredentials);
    }

    let session = SessionContext::new(credentials.username);
    let username = session.username.clone();
    let token = state.sessions.open(session).await;

    Ok(Json(LoginResponse {
        token,
        username,
        expires_in_seconds: state.sessions.ttl().as_secs(),
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<LogoutResponse>> {
    let (token, session) = require_session(&state, &headers).await?;
    state.sessions.close(&token).await;

    Ok(Json(LogoutResponse {
        status: "logged_out".to_string(),
        username: session.username,
    }))
}

pub async fn list_forecasts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<ForecastForm>>> {
    require_session(&state, &headers).await?;
    Ok(Json(ForecastKind::ALL.into_iter().map(ForecastForm::from).collect()))
}

pub async fn preview_forecast(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    Json(body): Json<SubmissionRequest>,
) -> AppResult<Json<PreviewResponse>> {
    let (_, session) = require_session(&state, &headers).await?;
    let kind = parse_kind(&kind)?;
    tracing::info!(kind = %kind, operator = %session.username, "Processing preview request");

    let values = if body.use_defaults {
        with_defaults(kind, body.fields)
    } else {
        body.fields
    };
    let request = state.workflow.preview(kind, &values)?;

    Ok(Json(request.into()))
}

pub async fn submit_forecast(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    Json(body): Json<SubmissionRequest>,
) -> AppResult<Json<SubmissionResponse>> {
    let start = Instant::now();
    let (_, session) = require_session(&state, &headers).await?;
    let kind = parse_kind(&kind)?;
    tracing::info!(kind = %kind, operator = %session.username, "Processing forecast submission");

    let values = if body.use_defaults {
        with_defaults(kind, body.fields)
    } else {
        body.fields
    };
    let outcome = state.workflow.run(&session, kind, &values).await?;

    tracing::info!(
        kind = %kind,
        record_id = %outcome.record_id,
        duration_ms = %start.elapsed().as_millis(),
        "Forecast submission completed"
    );
    Ok(Json(outcome.into()))
}
