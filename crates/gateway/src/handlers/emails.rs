//! Email handlers

use super::validate;
use crate::AppState;
use axum::{extract::State, Json};
use leadforge_common::{
    auth::AuthContext,
    errors::Result,
    models::EnrichmentResult,
    presenter::{mailto_link, personalize_email, split_subject, SenderProfile},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct RegenerateRequest {
    pub result: EnrichmentResult,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ComposeRequest {
    #[validate(length(min = 1, max = 20000))]
    pub email: String,

    #[serde(default)]
    pub sender: SenderProfile,

    #[validate(email)]
    pub recipient: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ComposeResponse {
    pub subject: String,
    pub body: String,
    pub mailto: String,
}

/// Draft a new email for an existing result; quota is not charged
pub async fn regenerate(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<RegenerateRequest>,
) -> Result<Json<EnrichmentResult>> {
    let (orchestrator, _) = state.orchestrator_for(&auth).await?;
    let updated = orchestrator.regenerate_email(request.result).await?;
    Ok(Json(updated))
}

/// Fill sender placeholders and build a `mailto:` link
pub async fn compose(
    _auth: AuthContext,
    Json(request): Json<ComposeRequest>,
) -> Result<Json<ComposeResponse>> {
    validate(&request)?;

    let email = personalize_email(&request.email, &request.sender);
    let (subject, body) = split_subject(&email);
    let mailto = mailto_link(request.recipient.as_deref(), &subject, &body);

    Ok(Json(ComposeResponse {
        subject,
        body,
        mailto,
    }))
}
