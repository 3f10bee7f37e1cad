use sqlx::SqlitePool;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{AuthUser, Comment, LikeResponse, PaginatedResponse};

async fn ensure_post(db: &SqlitePool, post_id: &str) -> ApiResult<()> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_one(db)
        .await?;
    if exists == 0 {
        return Err(ApiError::NotFound("Post not found".into()));
    }
    Ok(())
}

/// Like a post. Liking twice leaves the counter where it was.
pub async fn like(db: &SqlitePool, user_id: &str, post_id: &str) -> ApiResult<LikeResponse> {
    ensure_post(db, post_id).await?;

    let mut tx = db.begin().await?;
    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO post_likes (post_id, user_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(post_id)
    .bind(user_id)
    .bind(db::timestamp())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if inserted > 0 {
        sqlx::query("UPDATE posts SET like_count = like_count + 1 WHERE id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
    }

    let like_count = sqlx::query_scalar::<_, i64>("SELECT like_count FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(LikeResponse {
        post_id: post_id.to_string(),
        liked: true,
        like_count,
    })
}

/// Remove a like. Unliking a post that was not liked changes nothing.
pub async fn unlike(db: &SqlitePool, user_id: &str, post_id: &str) -> ApiResult<LikeResponse> {
    ensure_post(db, post_id).await?;

    let mut tx = db.begin().await?;
    let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = ? AND user_id = ?")
        .bind(post_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if removed > 0 {
        sqlx::query("UPDATE posts SET like_count = MAX(like_count - 1, 0) WHERE id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
    }

    let like_count = sqlx::query_scalar::<_, i64>("SELECT like_count FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(LikeResponse {
        post_id: post_id.to_string(),
        liked: false,
        like_count,
    })
}

pub async fn add_comment(
    db: &SqlitePool,
    author: &AuthUser,
    post_id: &str,
    content: &str,
) -> ApiResult<Comment> {
    stride_shared::validation::validate_comment_content(content).map_err(ApiError::Validation)?;
    ensure_post(db, post_id).await?;

    let comment = Comment {
        id: uuid::Uuid::new_v4().to_string(),
        post_id: post_id.to_string(),
        author_id: author.id.clone(),
        author_name: author.name.clone(),
        content: content.to_string(),
        created_at: db::timestamp(),
    };

    let mut tx = db.begin().await?;
    sqlx::query(
        r#"INSERT INTO comments (id, post_id, author_id, author_name, content, created_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&comment.id)
    .bind(&comment.post_id)
    .bind(&comment.author_id)
    .bind(&comment.author_name)
    .bind(&comment.content)
    .bind(&comment.created_at)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE posts SET comment_count = comment_count + 1 WHERE id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(comment)
}

/// Comments oldest first, paging forward from `cursor`.
pub async fn list_comments(
    db: &SqlitePool,
    post_id: &str,
    cursor: Option<&str>,
    limit: i64,
) -> ApiResult<PaginatedResponse<Comment>> {
    ensure_post(db, post_id).await?;

    let items = if let Some(cursor) = cursor {
        sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE post_id = ? AND created_at > ? ORDER BY created_at ASC LIMIT ?",
        )
        .bind(post_id)
        .bind(cursor)
        .bind(limit + 1)
        .fetch_all(db)
        .await?
    } else {
        sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE post_id = ? ORDER BY created_at ASC LIMIT ?",
        )
        .bind(post_id)
        .bind(limit + 1)
        .fetch_all(db)
        .await?
    };

    let has_more = items.len() as i64 > limit;
    let mut items = items;
    if has_more {
        items.pop();
    }
    let cursor = items.last().map(|c| c.created_at.clone());

    Ok(PaginatedResponse {
        items,
        cursor,
        has_more,
    })
}
