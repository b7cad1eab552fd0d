//! Redis-backed session store
//!
//! Keys: `{prefix}:quota:{user_id}`, value is the remaining-credit count.
//! A missing key is initialised to the free-trial allowance with SET NX.

use super::{SessionProvider, SessionStore};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Shared Redis connection handing out per-user stores
pub struct RedisSessionProvider {
    connection: Arc<RwLock<MultiplexedConnection>>,
    key_prefix: String,
    free_trial_credits: u32,
}

impl RedisSessionProvider {
    /// Connect to Redis
    pub async fn connect(url: &str, key_prefix: &str, free_trial_credits: u32) -> Result<Self> {
        let client = Client::open(url).map_err(|e| AppError::SessionStore {
            message: format!("Failed to create Redis client: {}", e),
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::SessionStore {
                message: format!("Failed to connect to Redis: {}", e),
            })?;

        Ok(Self {
            connection: Arc::new(RwLock::new(connection)),
            key_prefix: key_prefix.to_string(),
            free_trial_credits,
        })
    }
}

#[async_trait]
impl SessionProvider for RedisSessionProvider {
    async fn session(&self, user_id: &str, unlimited: bool) -> Result<Arc<dyn SessionStore>> {
        Ok(Arc::new(RedisSessionStore {
            connection: self.connection.clone(),
            key: quota_key(&self.key_prefix, user_id),
            free_trial_credits: self.free_trial_credits,
            unlimited,
        }))
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.write().await;
        redis::cmd("PING")
            .query_async::<String>(&mut *conn)
            .await
            .map_err(|e| AppError::SessionStore {
                message: format!("Redis ping failed: {}", e),
            })?;
        Ok(())
    }
}

/// Quota counter of one user in Redis
pub struct RedisSessionStore {
    connection: Arc<RwLock<MultiplexedConnection>>,
    key: String,
    free_trial_credits: u32,
    unlimited: bool,
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get_remaining(&self) -> Result<u32> {
        let mut conn = self.connection.write().await;

        let initialised: bool = conn.set_nx(&self.key, self.free_trial_credits).await?;
        if initialised {
            debug!(key = %self.key, credits = self.free_trial_credits, "Quota initialised");
        }

        let remaining: Option<u32> = conn.get(&self.key).await?;
        Ok(remaining.unwrap_or(self.free_trial_credits))
    }

    async fn is_unlimited(&self) -> Result<bool> {
        Ok(self.unlimited)
    }

    async fn set_remaining(&self, remaining: u32) -> Result<()> {
        let mut conn = self.connection.write().await;
        let _: () = conn.set(&self.key, remaining).await?;
        debug!(key = %self.key, remaining, "Quota persisted");
        Ok(())
    }
}

/// Build the quota key of a user
pub fn quota_key(prefix: &str, user_id: &str) -> String {
    format!("{}:quota:{}", prefix, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_key() {
        assert_eq!(quota_key("leadforge", "abc"), "leadforge:quota:abc");
    }
}
