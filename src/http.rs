//! HTTP surface: synchronous mapping plus the admin endpoints.
use anyhow::Result;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::TransformError;
use crate::mapper::ImageSetMapper;
use crate::queue::ProxyHealth;
use crate::relay::now_timestamp;

const JSON_UTF8: &str = "application/json;charset=utf-8";
static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub const QUEUE_CHECK_NAME: &str = "MessageQueueProxyReachable";

/// Anything the health endpoints can probe.
#[async_trait]
pub trait ConnectivityCheck: Send + Sync {
    /// Ok when the dependency is usable; the error text is reported verbatim.
    async fn check(&self) -> Result<()>;
}

#[async_trait]
impl ConnectivityCheck for ProxyHealth {
    async fn check(&self) -> Result<()> {
        ProxyHealth::check(self).await
    }
}

pub struct AppState {
    pub mapper: ImageSetMapper,
    pub health: Arc<dyn ConnectivityCheck>,
    pub system_code: String,
    pub name: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/map", post(map_content))
        .route("/__health", get(health))
        .route("/__gtg", get(good_to_go))
        .route("/__build-info", get(build_info))
        .with_state(state)
}

/// Error body returned when the pipeline rejects the request.
pub struct MappingFailure(TransformError);

impl IntoResponse for MappingFailure {
    fn into_response(self) -> Response {
        let body = json!({
            "message": format!("Error mapping the given content. {}", self.0),
        });
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            [(CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8))],
            body.to_string(),
        )
            .into_response()
    }
}

fn transaction_id(headers: &HeaderMap) -> String {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("tid_{}", Uuid::new_v4().simple()))
}

async fn map_content(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let tid = transaction_id(&headers);
    let mut response = match state.mapper.transform(&body, &now_timestamp(), &tid) {
        Ok(image_sets) => match serde_json::to_string(&image_sets) {
            Ok(json) => {
                info!(transaction_id = %tid, count = image_sets.len(), "mapped content over HTTP");
                (
                    StatusCode::OK,
                    [(CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8))],
                    json,
                )
                    .into_response()
            }
            Err(err) => {
                error!(%err, transaction_id = %tid, "couldn't serialise image-sets");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Err(err) => {
            warn!(transaction_id = %tid, stage = %err.stage, err = %err.cause, "mapping request failed");
            MappingFailure(err).into_response()
        }
    };
    if let Ok(value) = HeaderValue::from_str(&tid) {
        response.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }
    response
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub name: String,
    pub ok: bool,
    pub output: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub system_code: String,
    pub name: String,
    pub ok: bool,
    pub checks: Vec<CheckResult>,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    let check = match state.health.check().await {
        Ok(()) => CheckResult {
            name: QUEUE_CHECK_NAME.to_string(),
            ok: true,
            output: String::new(),
        },
        Err(err) => CheckResult {
            name: QUEUE_CHECK_NAME.to_string(),
            ok: false,
            output: format!("{err:#}"),
        },
    };
    Json(HealthReport {
        system_code: state.system_code.clone(),
        name: state.name.clone(),
        ok: check.ok,
        checks: vec![check],
    })
}

async fn good_to_go(State(state): State<Arc<AppState>>) -> (StatusCode, String) {
    match state.health.check().await {
        Ok(()) => (StatusCode::OK, "OK".to_string()),
        Err(err) => (StatusCode::SERVICE_UNAVAILABLE, format!("{err:#}")),
    }
}

async fn build_info() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
