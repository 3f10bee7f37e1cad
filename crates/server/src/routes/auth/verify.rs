use axum::{extract::State, Json};
use std::sync::Arc;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{AuthUser, VerifyEmailRequest};
use crate::AppState;

const VERIFICATION_TTL_HOURS: i64 = 24;

/// POST /api/auth/verify-email/request
///
/// Issues a verification token. Delivery is left to the mail integration;
/// the token is logged so it can be completed by hand in development.
pub async fn request_verification(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    let verified = sqlx::query_scalar::<_, bool>(r#"SELECT emailVerified FROM "user" WHERE id = ?"#)
        .bind(&user.id)
        .fetch_one(&state.db)
        .await?;
    if verified {
        return Ok(Json(serde_json::json!({ "alreadyVerified": true })));
    }

    let token = uuid::Uuid::new_v4().to_string();
    let expires_at = (chrono::Utc::now() + chrono::Duration::hours(VERIFICATION_TTL_HOURS))
        .to_rfc3339_opts(chrono::SecondsFormat::Micros, true);

    sqlx::query(
        r#"INSERT INTO "email_verification" (token, userId, expiresAt, createdAt) VALUES (?, ?, ?, ?)"#,
    )
    .bind(&token)
    .bind(&user.id)
    .bind(&expires_at)
    .bind(db::timestamp())
    .execute(&state.db)
    .await?;

    tracing::info!("Email verification token for {}: {}", user.id, token);

    Ok(Json(serde_json::json!({ "sent": true })))
}

/// POST /api/auth/verify-email
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyEmailRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let row = sqlx::query_as::<_, (String, String)>(
        r#"SELECT userId, expiresAt FROM "email_verification" WHERE token = ?"#,
    )
    .bind(&body.token)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("Unknown verification token".into()))?;

    let (user_id, expires_at) = row;
    let expired = chrono::DateTime::parse_from_rfc3339(&expires_at)
        .map(|t| t < chrono::Utc::now())
        .unwrap_or(true);

    sqlx::query(r#"DELETE FROM "email_verification" WHERE token = ?"#)
        .bind(&body.token)
        .execute(&state.db)
        .await?;

    if expired {
        return Err(ApiError::Validation("Verification token expired".into()));
    }

    sqlx::query(r#"UPDATE "user" SET emailVerified = 1, updatedAt = ? WHERE id = ?"#)
        .bind(db::timestamp())
        .bind(&user_id)
        .execute(&state.db)
        .await?;

    Ok(Json(serde_json::json!({ "verified": true })))
}
