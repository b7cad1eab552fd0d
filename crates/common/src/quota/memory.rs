//! In-memory session store for tests, the CLI and single-node deployments

use super::{SessionProvider, SessionStore};
use crate::errors::{AppError, Result};
use crate::models::QuotaState;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// Quota counter held in process memory
#[derive(Debug)]
pub struct InMemorySessionStore {
    state: Mutex<QuotaState>,
}

impl InMemorySessionStore {
    pub fn new(state: QuotaState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, QuotaState>> {
        self.state.lock().map_err(|_| AppError::SessionStore {
            message: "in-memory session state poisoned".to_string(),
        })
    }

    fn set_unlimited(&self, unlimited: bool) -> Result<()> {
        self.lock()?.unlimited = unlimited;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_remaining(&self) -> Result<u32> {
        Ok(self.lock()?.remaining)
    }

    async fn is_unlimited(&self) -> Result<bool> {
        Ok(self.lock()?.unlimited)
    }

    async fn set_remaining(&self, remaining: u32) -> Result<()> {
        self.lock()?.remaining = remaining;
        Ok(())
    }

    async fn state(&self) -> Result<QuotaState> {
        Ok(*self.lock()?)
    }
}

/// Per-user in-memory stores, created with the free-trial allowance on first use
pub struct InMemorySessionProvider {
    free_trial_credits: u32,
    sessions: RwLock<HashMap<String, Arc<InMemorySessionStore>>>,
}

impl InMemorySessionProvider {
    pub fn new(free_trial_credits: u32) -> Self {
        Self {
            free_trial_credits,
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SessionProvider for InMemorySessionProvider {
    async fn session(&self, user_id: &str, unlimited: bool) -> Result<Arc<dyn SessionStore>> {
        if let Some(store) = self.sessions.read().await.get(user_id) {
            store.set_unlimited(unlimited)?;
            return Ok(store.clone());
        }

        let mut sessions = self.sessions.write().await;
        let store = sessions
            .entry(user_id.to_string())
            .or_insert_with(|| {
                Arc::new(InMemorySessionStore::new(QuotaState::limited(
                    self.free_trial_credits,
                )))
            })
            .clone();
        store.set_unlimited(unlimited)?;
        Ok(store)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
