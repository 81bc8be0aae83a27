//! Sessions: the cached proof of a completed sign-in.
//!
//! A session is saved under an opaque token handed to the client as an
//! HTTP-only cookie (or sent back as a bearer token). Loading it skips
//! re-authentication; signing out clears it.

pub mod extract;
pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::identity::Identity;

pub use extract::{AdminSession, CurrentSession, OptionalSession, StudentSession};
pub use memory::InMemorySessionStore;
pub use redis_store::RedisSessionStore;

pub const SESSION_COOKIE: &str = "collector_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub identity: Identity,
    pub role: Role,
    /// Whether a record for this identity was seen at the last lookup.
    /// Decides if a résumé file is mandatory on submit.
    pub has_record: bool,
    pub signed_in_at: DateTime<Utc>,
}

impl Session {
    pub fn new(identity: Identity, role: Role) -> Self {
        Self {
            identity,
            role,
            has_record: false,
            signed_in_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, token: &str, session: &Session) -> Result<(), AppError>;

    async fn load(&self, token: &str) -> Result<Option<Session>, AppError>;

    async fn clear(&self, token: &str) -> Result<(), AppError>;
}

pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(new_token(), new_token());
        assert_eq!(new_token().len(), 32);
    }

    #[test]
    fn test_session_cookie_is_http_only() {
        let cookie = session_cookie("abc");
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_session_json_shape() {
        let session = Session::new(
            Identity {
                uid: "u1".into(),
                email: "asha@college.edu".into(),
            },
            Role::Student,
        );
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["role"], "student");
        assert_eq!(json["identity"]["uid"], "u1");
        assert_eq!(json["has_record"], false);
    }
}
