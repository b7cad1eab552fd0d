//! Application state shared across handlers

use axum::extract::FromRef;
use leadforge_common::{
    auth::{AuthContext, AuthVerifier},
    config::AppConfig,
    errors::Result,
    fallback::FallbackGenerator,
    notify::CollectingNotifier,
    oracle::EnrichmentOracle,
    orchestrator::{BatchOrchestrator, RunLocks},
    presenter::MemoryResultStore,
    quota::{QuotaGuard, SessionProvider},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub oracle: Arc<dyn EnrichmentOracle>,
    pub sessions: Arc<dyn SessionProvider>,
    pub results: Arc<MemoryResultStore>,
    pub run_locks: Arc<RunLocks>,
    pub auth: Arc<AuthVerifier>,
}

impl FromRef<AppState> for Arc<AuthVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl AppState {
    /// Orchestrator bound to the caller's session, plus the notices it emits
    pub async fn orchestrator_for(
        &self,
        auth: &AuthContext,
    ) -> Result<(BatchOrchestrator, Arc<CollectingNotifier>)> {
        let notifier = Arc::new(CollectingNotifier::new());
        let session = self.sessions.session(&auth.user_id, auth.unlimited).await?;

        let orchestrator = BatchOrchestrator::new(
            self.oracle.clone(),
            QuotaGuard::new(session, notifier.clone()),
            self.results.presenter_for(&auth.user_id),
            notifier.clone(),
            FallbackGenerator::new(self.config.fallback.clone()),
            self.config.batch.clone(),
        )
        .with_run_lock(self.run_locks.for_user(&auth.user_id).await)
        .with_upload_limit(self.config.server.max_upload_bytes);

        Ok((orchestrator, notifier))
    }
}
