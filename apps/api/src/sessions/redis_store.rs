use async_trait::async_trait;
use redis::AsyncCommands;

use crate::errors::AppError;
use crate::sessions::{Session, SessionStore};

/// Sessions as JSON under `session:{token}`, expiring after the configured TTL.
pub struct RedisSessionStore {
    client: redis::Client,
    ttl_secs: u64,
}

impl RedisSessionStore {
    pub fn new(client: redis::Client, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }

    fn key(token: &str) -> String {
        format!("session:{token}")
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn save(&self, token: &str, session: &Session) -> Result<(), AppError> {
        let payload =
            serde_json::to_string(session).map_err(|e| AppError::Internal(e.into()))?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(Self::key(token), payload, self.ttl_secs)
            .await?;
        Ok(())
    }

    async fn load(&self, token: &str) -> Result<Option<Session>, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(Self::key(token)).await?;
        match raw {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(session) => Ok(Some(session)),
                Err(e) => {
                    // Written by an older layout; treat as signed out.
                    tracing::warn!("Discarding unreadable session: {e}");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn clear(&self, token: &str) -> Result<(), AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(Self::key(token)).await?;
        Ok(())
    }
}
