use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::chat::unread;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::events::ratings;
use crate::feed;
use crate::models::{AuthUser, Dashboard, SessionUser, UpdateUserRequest, UserSummary};
use crate::routes::auth::load_session_user;
use crate::AppState;

const MAX_IMAGE_URL_LENGTH: usize = 2048;
const MAX_DISPLAY_NAME_LENGTH: usize = 64;
const SEARCH_LIMIT: i64 = 20;

/// GET /api/users/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<SessionUser>> {
    Ok(Json(load_session_user(&state, &user.id).await?))
}

/// PATCH /api/users/me
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<UpdateUserRequest>,
) -> ApiResult<Json<SessionUser>> {
    if body.name.is_none() && body.image.is_none() && body.theme.is_none() {
        return Err(ApiError::Validation("No fields to update".into()));
    }

    let name = match body.name.as_deref().map(str::trim) {
        Some("") => return Err(ApiError::Validation("Name cannot be empty".into())),
        Some(n) if n.chars().count() > MAX_DISPLAY_NAME_LENGTH => {
            return Err(ApiError::Validation(format!(
                "Name must be at most {} characters",
                MAX_DISPLAY_NAME_LENGTH
            )))
        }
        other => other,
    };

    // Outer None: leave as is. Inner None: clear.
    let image: Option<Option<&str>> = match &body.image {
        None => None,
        Some(serde_json::Value::Null) => Some(None),
        Some(serde_json::Value::String(url)) if url.len() <= MAX_IMAGE_URL_LENGTH => {
            Some(Some(url.as_str()))
        }
        Some(serde_json::Value::String(_)) => {
            return Err(ApiError::Validation("Image URL too long".into()))
        }
        Some(_) => return Err(ApiError::Validation("Image must be a string or null".into())),
    };

    let now = db::timestamp();
    let mut tx = state.db.begin().await?;
    if let Some(name) = name {
        sqlx::query(r#"UPDATE "user" SET name = ?, updatedAt = ? WHERE id = ?"#)
            .bind(name)
            .bind(&now)
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(image) = image {
        sqlx::query(r#"UPDATE "user" SET image = ?, updatedAt = ? WHERE id = ?"#)
            .bind(image)
            .bind(&now)
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(theme) = body.theme {
        sqlx::query(r#"UPDATE "user" SET theme = ?, updatedAt = ? WHERE id = ?"#)
            .bind(theme)
            .bind(&now)
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    Ok(Json(load_session_user(&state, &user.id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/users/search?q=
pub async fn search_users(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let escaped = q.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    let pattern = format!("%{}%", escaped);

    let users = sqlx::query_as::<_, UserSummary>(
        r#"SELECT id, username, name, image FROM "user"
           WHERE (username LIKE ? ESCAPE '\' OR name LIKE ? ESCAPE '\') AND id != ?
           ORDER BY username
           LIMIT ?"#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .bind(&user.id)
    .bind(SEARCH_LIMIT)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(users))
}

/// GET /api/users/me/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Dashboard>> {
    let conversation_count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM conversation_participants WHERE user_id = ?",
    )
    .bind(&user.id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(Dashboard {
        conversation_count,
        total_unread: unread::total_unread(&state.db, &user.id).await?,
        post_count: feed::count_by_author(&state.db, &user.id).await?,
        ratings_given: ratings::count_by_user(&state.db, &user.id).await?,
    }))
}
