//! Result handlers

use crate::AppState;
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use leadforge_common::{
    auth::AuthContext,
    errors::{AppError, Result},
    models::RunReport,
    presenter::download_artifact,
};

/// Latest completed run of the caller
pub async fn latest(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<RunReport>> {
    state
        .results
        .latest(&auth.user_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound {
            resource_type: "results".to_string(),
            id: auth.user_id,
        })
}

/// Raw-JSON download of the latest run
pub async fn download(State(state): State<AppState>, auth: AuthContext) -> Result<Response> {
    let report = state
        .results
        .latest(&auth.user_id)
        .await
        .ok_or_else(|| AppError::NotFound {
            resource_type: "results".to_string(),
            id: auth.user_id.clone(),
        })?;

    let artifact = download_artifact(&report.results)?;
    let disposition = format!("attachment; filename=\"{}\"", artifact.file_name);

    Ok((
        [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response())
}
