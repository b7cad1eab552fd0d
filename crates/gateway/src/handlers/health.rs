//! Health check handlers

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub session_store: CheckResult,
    pub oracle: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct OracleStatusResponse {
    pub has_api_key: bool,
    pub model: String,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: leadforge_common::VERSION,
    })
}

/// Readiness probe - session store reachable and oracle credential present
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let start = std::time::Instant::now();

    let session_store = match state.sessions.ping().await {
        Ok(_) => CheckResult {
            status: "up".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => CheckResult {
            status: "down".to_string(),
            latency_ms: None,
            error: Some(e.to_string()),
        },
    };

    let oracle = if state.oracle.is_configured() {
        CheckResult {
            status: "up".to_string(),
            latency_ms: None,
            error: None,
        }
    } else {
        CheckResult {
            status: "down".to_string(),
            latency_ms: None,
            error: Some("API key not configured".to_string()),
        }
    };

    let all_healthy = session_store.status == "up" && oracle.status == "up";

    Json(ReadyResponse {
        status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
        checks: HealthChecks {
            session_store,
            oracle,
        },
    })
}

/// Whether the oracle credential is configured
pub async fn oracle_status(State(state): State<AppState>) -> Json<OracleStatusResponse> {
    Json(OracleStatusResponse {
        has_api_key: state.oracle.is_configured(),
        model: state.oracle.model_name().to_string(),
    })
}
