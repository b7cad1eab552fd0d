//! Quota handlers

use crate::AppState;
use axum::{extract::State, Json};
use leadforge_common::{auth::AuthContext, errors::Result, models::QuotaState};

/// Remaining credits of the caller
pub async fn get_quota(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<QuotaState>> {
    let session = state.sessions.session(&auth.user_id, auth.unlimited).await?;
    Ok(Json(session.state().await?))
}
