use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;

use crate::errors::AppError;
use crate::sessions::{Role, Session, SESSION_COOKIE};
use crate::state::AppState;

/// Session token from the session cookie, falling back to `Authorization: Bearer`.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE).filter(|c| !c.value().is_empty()) {
        return Some(cookie.value().to_string());
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

/// A signed-in caller. Rejects with 401 when there is no live session.
pub struct CurrentSession {
    pub token: String,
    pub session: Session,
}

/// Like `CurrentSession`, but a missing or expired session is `None`
/// instead of a rejection. Session store failures still reject.
pub struct OptionalSession(pub Option<CurrentSession>);

/// A caller that passed the admin gate. 401 without a session, 403 for students.
pub struct AdminSession(pub CurrentSession);

/// A signed-in student. Admin sessions get 403 so they cannot own a record.
pub struct StudentSession(pub CurrentSession);

#[async_trait]
impl FromRequestParts<AppState> for OptionalSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Ok(OptionalSession(None));
        };
        let session = state.sessions.load(&token).await?;
        if session.is_none() {
            tracing::debug!("Session token presented but not found");
        }
        Ok(OptionalSession(
            session.map(|session| CurrentSession { token, session }),
        ))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let OptionalSession(current) = OptionalSession::from_request_parts(parts, state).await?;
        current.ok_or(AppError::Unauthorized)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let current = CurrentSession::from_request_parts(parts, state).await?;
        if current.session.role != Role::Admin {
            tracing::warn!(
                "Non-admin {} attempted an admin route",
                current.session.identity.uid
            );
            return Err(AppError::Forbidden);
        }
        Ok(AdminSession(current))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for StudentSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let current = CurrentSession::from_request_parts(parts, state).await?;
        if current.session.role != Role::Student {
            tracing::warn!(
                "Admin {} attempted a student route",
                current.session.identity.uid
            );
            return Err(AppError::Forbidden);
        }
        Ok(StudentSession(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderValue};

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; collector_session=abc123"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_token_from_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(session_token(&headers).is_none());
    }
}
