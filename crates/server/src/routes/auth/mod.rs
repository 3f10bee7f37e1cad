mod session;
mod verify;

pub use session::*;
pub use verify::*;

use argon2::PasswordHasher;
use axum::{
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use std::sync::{Arc, OnceLock};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::middleware::SESSION_COOKIE;
use crate::models::{SessionResponse, SessionUser, SignUpRequest};
use crate::AppState;

fn email_regex() -> &'static regex_lite::Regex {
    static RE: OnceLock<regex_lite::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex_lite::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern")
    })
}

pub fn validate_email(email: &str) -> ApiResult<()> {
    if email_regex().is_match(email) {
        Ok(())
    } else {
        Err(ApiError::Validation("Invalid email address".into()))
    }
}

/// Insert a session row and build the cookie that carries it.
pub(crate) async fn create_session(
    state: &AppState,
    user_id: &str,
) -> ApiResult<(String, HeaderMap)> {
    let session_token = uuid::Uuid::new_v4().to_string();
    let session_id = uuid::Uuid::new_v4().to_string();
    let now = db::timestamp();
    let ttl = chrono::Duration::days(state.config.session_ttl_days);
    let expires_at = (chrono::Utc::now() + ttl)
        .to_rfc3339_opts(chrono::SecondsFormat::Micros, true);

    sqlx::query(
        r#"INSERT INTO "session" (id, userId, token, expiresAt, createdAt, updatedAt)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&session_id)
    .bind(user_id)
    .bind(&session_token)
    .bind(&expires_at)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        session_token,
        ttl.num_seconds()
    );
    let mut headers = HeaderMap::new();
    if let Ok(value) = cookie.parse() {
        headers.insert("set-cookie", value);
    }
    Ok((session_token, headers))
}

pub(crate) async fn load_session_user(state: &AppState, user_id: &str) -> ApiResult<SessionUser> {
    sqlx::query_as::<_, SessionUser>(
        r#"SELECT id, email, username, name, image, theme, emailVerified, is_super_admin FROM "user" WHERE id = ?"#,
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

/// POST /api/auth/sign-up/email
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignUpRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = body.email.trim().to_lowercase();
    let username = body.username.trim().to_string();
    let name = body.name.trim().to_string();

    validate_email(&email)?;
    stride_shared::validation::validate_username(&username).map_err(ApiError::Validation)?;
    stride_shared::validation::validate_password(&body.password).map_err(ApiError::Validation)?;
    if name.is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }

    let exists = sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM "user" WHERE email = ?"#)
        .bind(&email)
        .fetch_one(&state.db)
        .await?;
    if exists > 0 {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let exists = sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM "user" WHERE username = ?"#)
        .bind(&username)
        .fetch_one(&state.db)
        .await?;
    if exists > 0 {
        return Err(ApiError::Conflict("Username already taken".into()));
    }

    let salt = argon2::password_hash::SaltString::generate(&mut rand::rngs::OsRng);
    let password_hash = argon2::Argon2::default()
        .hash_password(body.password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            ApiError::Validation("Password could not be processed".into())
        })?
        .to_string();

    let user_id = uuid::Uuid::new_v4().to_string();
    let now = db::timestamp();

    let mut tx = state.db.begin().await?;
    sqlx::query(
        r#"INSERT INTO "user" (id, name, username, email, emailVerified, createdAt, updatedAt)
           VALUES (?, ?, ?, ?, 0, ?, ?)"#,
    )
    .bind(&user_id)
    .bind(&name)
    .bind(&username)
    .bind(&email)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"INSERT INTO "account" (id, userId, accountId, providerId, password, createdAt, updatedAt)
           VALUES (?, ?, ?, 'credential', ?, ?, ?)"#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&user_id)
    .bind(&user_id)
    .bind(&password_hash)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!("User {} signed up as {}", user_id, username);

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
