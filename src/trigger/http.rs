//! HTTP trigger
//!
//! | Route | Answer |
//! |---|---|
//! | `GET /`, `POST /` | plain-text `DONE` / `No shipments found`, or `ERROR: ...` with 500 |
//! | `GET /run?format=json` | the run report as JSON (500 when a seller failed) |
//! | `GET /health` | service name, version and uptime |
//! | `GET /metrics` | Prometheus text format |

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::Runner;
use crate::workflow::RunReport;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<Runner>,
    pub start_time: Instant,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
    pub running: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunParams {
    pub format: Option<String>,
}

/// Build the trigger router
pub fn router(runner: Arc<Runner>) -> Router {
    let state = AppState {
        runner,
        start_time: Instant::now(),
    };

    Router::new()
        .route("/", get(run_text).post(run_text))
        .route("/run", get(run).post(run))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Plain-text answer of a finished run
fn text_response(report: &RunReport) -> Response {
    match report.summary() {
        Ok(token) => (StatusCode::OK, token).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("ERROR: {e}")).into_response(),
    }
}

async fn run_text(State(state): State<AppState>) -> Response {
    let report = state.runner.run().await;
    text_response(&report)
}

async fn run(State(state): State<AppState>, Query(params): Query<RunParams>) -> Response {
    let report = state.runner.run().await;

    match params.format.as_deref() {
        Some("json") => {
            let status = if report.has_failures() {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::OK
            };
            (status, Json(report)).into_response()
        }
        _ => text_response(&report),
    }
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        running: state.runner.is_busy(),
    })
}

async fn metrics() -> Response {
    match crate::metrics::encode_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {e}"),
        )
            .into_response(),
    }
}
