use axum::{
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{session_token_from_headers, SESSION_COOKIE};
use crate::models::{AuthUser, SessionResponse, SignInRequest};
use crate::AppState;

use super::{create_session, load_session_user};

/// POST /api/auth/sign-in/email
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignInRequest>,
) -> ApiResult<impl IntoResponse> {
    use argon2::PasswordVerifier;

    let invalid = || ApiError::Unauthorized("Invalid credentials".into());
    let email = body.email.trim().to_lowercase();

    let user_id = sqlx::query_scalar::<_, String>(r#"SELECT id FROM "user" WHERE email = ?"#)
        .bind(&email)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(invalid)?;

    let stored_hash = sqlx::query_scalar::<_, String>(
        r#"SELECT password FROM "account" WHERE userId = ? AND providerId = 'credential'"#,
    )
    .bind(&user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(invalid)?;

    let parsed_hash = argon2::PasswordHash::new(&stored_hash).map_err(|e| {
        tracing::error!("Stored hash for {} unreadable: {}", user_id, e);
        invalid()
    })?;

    argon2::Argon2::default()
        .verify_password(body.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    let (token, headers) = create_session(&state, &user_id).await?;
    let user = load_session_user(&state, &user_id).await?;

    Ok((
        headers,
        Json(SessionResponse {
            user,
            token: Some(token),
        }),
    ))
}

/// POST /api/auth/sign-out
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    if let Some(token) = session_token_from_headers(&headers) {
        sqlx::query(r#"DELETE FROM "session" WHERE token = ?"#)
            .bind(&token)
            .execute(&state.db)
            .await?;
    }

    let mut response_headers = HeaderMap::new();
    let cookie = format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE);
    if let Ok(value) = cookie.parse() {
        response_headers.insert("set-cookie", value);
    }
    Ok((response_headers, Json(serde_json::json!({ "success": true }))))
}

/// GET /api/auth/get-session
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<SessionResponse>> {
    let user = load_session_user(&state, &user.id).await?;
    Ok(Json(SessionResponse { user, token: None }))
}
