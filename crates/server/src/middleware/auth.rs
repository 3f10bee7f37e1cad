use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::AuthUser;
use crate::AppState;

pub const SESSION_COOKIE: &str = "stride.session_token";

/// Session token from `Authorization: Bearer` or the session cookie.
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    let cookie = headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .split(';')
        .filter_map(|c| {
            c.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .map(|t| t.to_string())
        })
        .next();

    bearer.or(cookie).filter(|t| !t.is_empty())
}

/// Look up a session token and resolve the caller with their capabilities.
pub async fn resolve_session(db: &SqlitePool, token: &str) -> Result<AuthUser, ApiError> {
    let row = sqlx::query_as::<_, (String, String, String, bool, String)>(
        r#"SELECT u.id, u.username, u.name, u.is_super_admin, s.expiresAt
           FROM "session" s
           JOIN "user" u ON u.id = s.userId
           WHERE s.token = ?"#,
    )
    .bind(token)
    .fetch_optional(db)
    .await?;

    let (id, username, name, is_super_admin, expires_at) =
        row.ok_or_else(|| ApiError::Unauthorized("Invalid session".into()))?;

    let expired = chrono::DateTime::parse_from_rfc3339(&expires_at)
        .map(|t| t < chrono::Utc::now())
        .unwrap_or(true);
    if expired {
        return Err(ApiError::Unauthorized("Session expired".into()));
    }

    Ok(AuthUser {
        id,
        username,
        name,
        is_super_admin,
    })
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token_from_headers(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))?;
        resolve_session(&state.db, &token).await
    }
}
