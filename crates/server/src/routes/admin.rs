use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{AdminUpdateUserRequest, AuthUser};
use crate::AppState;

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserRow {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub is_super_admin: bool,
    #[sqlx(rename = "createdAt")]
    pub created_at: String,
}

fn require_super_admin(user: &AuthUser) -> ApiResult<()> {
    if user.is_super_admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Super admin only".into()))
    }
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<AdminUserRow>>> {
    require_super_admin(&user)?;

    let users = sqlx::query_as::<_, AdminUserRow>(
        r#"SELECT id, username, name, email, is_super_admin, createdAt FROM "user" ORDER BY createdAt"#,
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(users))
}

/// PATCH /api/admin/users/{userId}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(user_id): Path<String>,
    Json(body): Json<AdminUpdateUserRequest>,
) -> ApiResult<Json<AdminUserRow>> {
    require_super_admin(&user)?;
    if user_id == user.id && !body.is_super_admin {
        return Err(ApiError::Validation("You cannot revoke your own super admin role".into()));
    }

    let result = sqlx::query(r#"UPDATE "user" SET is_super_admin = ?, updatedAt = ? WHERE id = ?"#)
        .bind(body.is_super_admin)
        .bind(db::timestamp())
        .bind(&user_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("User not found".into()));
    }

    tracing::info!(
        "Super admin {} set is_super_admin={} on {}",
        user.id,
        body.is_super_admin,
        user_id
    );

    let row = sqlx::query_as::<_, AdminUserRow>(
        r#"SELECT id, username, name, email, is_super_admin, createdAt FROM "user" WHERE id = ?"#,
    )
    .bind(&user_id)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(row))
}
