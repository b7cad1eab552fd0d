//! Enrichment run handlers

use super::validate;
use crate::AppState;
use axum::{extract::State, Json};
use leadforge_common::{
    auth::AuthContext,
    errors::{AppError, Result},
    models::{EnrichmentResult, RunReport},
    notify::Notice,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use uuid::Uuid;
use validator::Validate;

/// Uploaded lead list, content as text
#[derive(Debug, Deserialize, Validate)]
pub struct UploadRequest {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,

    pub content: String,
}

/// External data source link
#[derive(Debug, Deserialize, Validate)]
pub struct ExternalSourceRequest {
    #[validate(length(min = 1, max = 64))]
    pub source: String,

    #[serde(default)]
    #[validate(length(max = 2048))]
    pub url: String,
}

/// Response of every enrichment run
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub run_id: Uuid,
    pub results: Vec<EnrichmentResult>,
    pub notices: Vec<Notice>,
}

impl RunResponse {
    fn new(report: RunReport, notices: Vec<Notice>) -> Self {
        Self {
            run_id: report.run_id,
            results: report.results,
            notices,
        }
    }
}

/// Drive a run on its own task; a dropped request does not cancel it,
/// so the results still reach the result store
async fn run_detached<F>(run: F) -> Result<RunReport>
where
    F: Future<Output = Result<RunReport>> + Send + 'static,
{
    tokio::spawn(run).await.map_err(|e| AppError::Internal {
        message: format!("Enrichment run task failed: {}", e),
    })?
}

/// Decode an uploaded file and enrich every company in it
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<UploadRequest>,
) -> Result<Json<RunResponse>> {
    validate(&request)?;

    let (orchestrator, notifier) = state.orchestrator_for(&auth).await?;
    let report = run_detached(async move {
        orchestrator
            .process_upload(&request.file_name, request.content.as_bytes())
            .await
    })
    .await?;

    Ok(Json(RunResponse::new(report, notifier.drain())))
}

/// Enrich the sample company
pub async fn sample(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<RunResponse>> {
    let (orchestrator, notifier) = state.orchestrator_for(&auth).await?;
    let report = run_detached(async move { orchestrator.process_sample().await }).await?;

    Ok(Json(RunResponse::new(report, notifier.drain())))
}

/// Enrich the company behind an external data source link
pub async fn external(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<ExternalSourceRequest>,
) -> Result<Json<RunResponse>> {
    validate(&request)?;

    let (orchestrator, notifier) = state.orchestrator_for(&auth).await?;
    let report = run_detached(async move {
        orchestrator
            .process_external_source(&request.source, &request.url)
            .await
    })
    .await?;

    Ok(Json(RunResponse::new(report, notifier.drain())))
}
