//! Quota guard
//!
//! Gates enrichment runs on a per-user remaining-credits counter and
//! decrements it once per completed run. The counter lives behind an
//! injected `SessionStore`; nothing here touches global state.

mod memory;
mod redis_store;

pub use self::memory::{InMemorySessionProvider, InMemorySessionStore};
pub use self::redis_store::{RedisSessionProvider, RedisSessionStore};

use crate::config::QuotaConfig;
use crate::errors::{AppError, Result};
use crate::models::QuotaState;
use crate::notify::{Notice, Notifier};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Remaining-credits storage of one user session
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_remaining(&self) -> Result<u32>;

    async fn is_unlimited(&self) -> Result<bool>;

    async fn set_remaining(&self, remaining: u32) -> Result<()>;

    /// Both values at once
    async fn state(&self) -> Result<QuotaState> {
        Ok(QuotaState {
            remaining: self.get_remaining().await?,
            unlimited: self.is_unlimited().await?,
        })
    }
}

/// Hands out the session store of a given user
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Store for `user_id`; `unlimited` comes from the session provider's claims
    async fn session(&self, user_id: &str, unlimited: bool) -> Result<Arc<dyn SessionStore>>;

    /// Connectivity check of the backing store
    async fn ping(&self) -> Result<()>;
}

/// Create a session provider based on configuration
pub async fn create_session_provider(config: &QuotaConfig) -> Result<Arc<dyn SessionProvider>> {
    match config.store.as_str() {
        "memory" => Ok(Arc::new(InMemorySessionProvider::new(config.free_trial_credits))),
        "redis" => {
            let url = config.redis_url.as_deref().ok_or_else(|| AppError::Configuration {
                message: "quota.redis_url is required when quota.store = \"redis\"".to_string(),
            })?;
            let provider =
                RedisSessionProvider::connect(url, &config.key_prefix, config.free_trial_credits)
                    .await?;
            Ok(Arc::new(provider))
        }
        other => Err(AppError::Configuration {
            message: format!("Unknown quota store: {}", other),
        }),
    }
}

/// Enforces the per-user usage ceiling
#[derive(Clone)]
pub struct QuotaGuard {
    store: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
}

impl QuotaGuard {
    pub fn new(store: Arc<dyn SessionStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// True when unlimited or credits remain. Never mutates.
    pub async fn check_limit(&self) -> Result<bool> {
        let state = self.store.state().await?;
        if state.allows_run() {
            debug!(remaining = state.remaining, unlimited = state.unlimited, "Quota check passed");
            return Ok(true);
        }

        info!(remaining = state.remaining, "Quota exhausted, run refused");
        self.notifier
            .notify(Notice::error("Free trial limit reached. Please upgrade to continue."));
        Ok(false)
    }

    /// Consume one credit. No-op when unlimited or already at zero.
    pub async fn decrement(&self) -> Result<QuotaState> {
        let state = self.store.state().await?;
        if state.unlimited || state.remaining == 0 {
            return Ok(state);
        }

        let remaining = state.remaining - 1;
        self.store.set_remaining(remaining).await?;

        metrics::counter!(format!("{}_quota_decrements_total", crate::metrics::METRICS_PREFIX))
            .increment(1);
        info!(remaining, "Quota decremented");

        match remaining {
            0 => self.notifier.notify(Notice::warning(
                "You've used all your free trial credits. Upgrade to continue.",
            )),
            1..=3 => self
                .notifier
                .notify(Notice::info(format!("Only {} free credits remaining.", remaining))),
            _ => {}
        }

        Ok(QuotaState::limited(remaining))
    }

    /// Current snapshot
    pub async fn state(&self) -> Result<QuotaState> {
        self.store.state().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::CollectingNotifier;

    fn make_guard(state: QuotaState) -> (QuotaGuard, Arc<InMemorySessionStore>, Arc<CollectingNotifier>) {
        let store = Arc::new(InMemorySessionStore::new(state));
        let notifier = Arc::new(CollectingNotifier::new());
        (QuotaGuard::new(store.clone(), notifier.clone()), store, notifier)
    }

    #[tokio::test]
    async fn test_check_limit_refuses_at_zero() {
        let (guard, store, notifier) = make_guard(QuotaState::limited(0));
        assert!(!guard.check_limit().await.unwrap());
        assert_eq!(store.get_remaining().await.unwrap(), 0);
        assert!(matches!(notifier.drain()[0], Notice::Error { .. }));
    }

    #[tokio::test]
    async fn test_check_limit_passes_unlimited() {
        let (guard, _, notifier) = make_guard(QuotaState::unlimited());
        assert!(guard.check_limit().await.unwrap());
        assert!(notifier.drain().is_empty());
    }

    #[tokio::test]
    async fn test_decrement_noop_when_unlimited_or_empty() {
        let (guard, store, _) = make_guard(QuotaState::unlimited());
        let state = guard.decrement().await.unwrap();
        assert!(state.unlimited);
        assert_eq!(store.get_remaining().await.unwrap(), 0);

        let (guard, store, notifier) = guard_at(0);
        assert_eq!(guard.decrement().await.unwrap().remaining, 0);
        assert_eq!(store.get_remaining().await.unwrap(), 0);
        assert!(notifier.drain().is_empty());
    }

    fn guard_at(remaining: u32) -> (QuotaGuard, Arc<InMemorySessionStore>, Arc<CollectingNotifier>) {
        make_guard(QuotaState::limited(remaining))
    }

    #[tokio::test]
    async fn test_low_balance_notices() {
        let (guard, store, notifier) = guard_at(5);

        guard.decrement().await.unwrap();
        assert_eq!(store.get_remaining().await.unwrap(), 4);
        assert!(notifier.drain().is_empty());

        guard.decrement().await.unwrap();
        assert_eq!(
            notifier.drain(),
            vec![Notice::info("Only 3 free credits remaining.")]
        );

        guard.decrement().await.unwrap();
        guard.decrement().await.unwrap();
        notifier.drain();

        let state = guard.decrement().await.unwrap();
        assert_eq!(state, QuotaState::limited(0));
        assert!(matches!(notifier.drain()[0], Notice::Warning { .. }));
    }

    #[test]
    fn test_state_reads_through_store() {
        let (guard, _, _) = guard_at(2);
        let state = tokio_test::block_on(guard.state());
        assert_eq!(tokio_test::assert_ok!(state), QuotaState::limited(2));
    }
}
