use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::sessions::{Session, SessionStore};

/// Process-local sessions with the same expiry semantics as Redis.
/// Expired entries are dropped on load and swept on every save.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, (Session, DateTime<Utc>)>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs.min(u64::from(u32::MAX)) as i64),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, token: &str, session: &Session) -> Result<(), AppError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, (_, expires_at)| *expires_at > now);
        sessions.insert(token.to_string(), (session.clone(), now + self.ttl));
        Ok(())
    }

    async fn load(&self, token: &str) -> Result<Option<Session>, AppError> {
        let mut sessions = self.sessions.write().await;
        let expired = match sessions.get(token) {
            Some((_, expires_at)) => *expires_at <= Utc::now(),
            None => return Ok(None),
        };
        if expired {
            sessions.remove(token);
            return Ok(None);
        }
        Ok(sessions.get(token).map(|(session, _)| session.clone()))
    }

    async fn clear(&self, token: &str) -> Result<(), AppError> {
        self.sessions.write().await.remove(token);
        Ok(())
    }
}
