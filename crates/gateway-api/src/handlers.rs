//! HTTP handlers for the orchestrated routes and cache inspection.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use gateway_domain::{Payload, RouteName};
use serde_json::{Value, json};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::orchestrator::{CacheStatus, Dispatched};

/// Response header reporting HIT / MISS / BYPASS
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

fn json_text(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response()
}

fn with_cache_header(mut response: Response, cache: CacheStatus) -> Response {
    response
        .headers_mut()
        .insert(X_CACHE, HeaderValue::from_static(cache.as_str()));
    response
}

fn dispatched(dispatched: Dispatched) -> Response {
    with_cache_header(json_text(StatusCode::OK, dispatched.body), dispatched.cache)
}

fn payload(body: Result<Json<Payload>, JsonRejection>) -> ApiResult<Payload> {
    body.map(|Json(payload)| payload)
        .map_err(|rejection| ApiError::InvalidInput {
            status: rejection.status(),
            message: rejection.body_text(),
        })
}

/// `POST /preprocess`
pub async fn preprocess(
    State(state): State<AppState>,
    body: Result<Json<Payload>, JsonRejection>,
) -> ApiResult<Response> {
    let payload = payload(body)?;
    let result = state
        .orchestrator
        .dispatch(RouteName::Preprocess, Some(&payload))
        .await?;
    Ok(dispatched(result))
}

/// `POST /predict`
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<Payload>, JsonRejection>,
) -> ApiResult<Response> {
    let payload = payload(body)?;
    let result = state
        .orchestrator
        .dispatch(RouteName::Predict, Some(&payload))
        .await?;
    Ok(dispatched(result))
}

/// `POST /train` - no request body; the backend answer is wrapped
pub async fn train(State(state): State<AppState>) -> ApiResult<Response> {
    let result = state.orchestrator.dispatch(RouteName::Train, None).await?;
    let backend: Value = serde_json::from_str(&result.body).unwrap_or(Value::Null);

    let response = Json(json!({
        "message": "training started",
        "backend_response": backend,
    }))
    .into_response();
    Ok(with_cache_header(response, result.cache))
}

/// `GET /experiments`
pub async fn experiments(State(state): State<AppState>) -> ApiResult<Response> {
    let result = state
        .orchestrator
        .dispatch(RouteName::Experiments, None)
        .await?;
    Ok(dispatched(result))
}

/// `GET /cache/{key}`
pub async fn read_cache(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Response> {
    let value = state.orchestrator.read_cached(&key).await?;

    // Entries written by the gateway are JSON; anything else is returned as a string
    if serde_json::from_str::<Value>(&value).is_ok() {
        Ok(json_text(StatusCode::OK, value))
    } else {
        Ok(Json(Value::String(value)).into_response())
    }
}

/// `DELETE /cache/{key}` - always succeeds
pub async fn delete_cache(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    let removed = state.orchestrator.delete_cached(&key).await;
    Json(json!({
        "message": format!("cache entry deleted for key {key}"),
        "removed": removed,
    }))
}

/// `GET /`
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Model services gateway - orchestration of AI services",
        "version": crate::VERSION,
    }))
}

/// `GET /health`
pub async fn health_check() -> impl IntoResponse {
    "OK"
}

/// `GET /health/ready` - the cache is optional, so readiness only reports it
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let cache = state.orchestrator.cache();
    let reachable = cache.is_reachable().await;

    Json(json!({
        "status": "ready",
        "cache": {
            "backend": cache.backend_name(),
            "reachable": reachable,
        },
    }))
}
