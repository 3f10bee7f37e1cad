//! Activity feed: posts, their media, likes and comments.

pub mod engagement;

use std::collections::{HashMap, HashSet};

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use stride_shared::constants::MAX_POST_MEDIA;

use crate::config::Config;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{AuthUser, CreatePostRequest, MediaRef, PaginatedResponse, Post};

/// Build a media map from a list of posts, in upload order.
async fn fetch_media_map(
    db: &SqlitePool,
    config: &Config,
    items: &[Post],
) -> Result<HashMap<String, Vec<MediaRef>>, sqlx::Error> {
    let mut media_map: HashMap<String, Vec<MediaRef>> = HashMap::new();
    if items.is_empty() {
        return Ok(media_map);
    }

    let placeholders: Vec<&str> = items.iter().map(|_| "?").collect();
    let sql = format!(
        r#"SELECT pm.post_id, a.id, a.content_type
           FROM post_media pm
           JOIN attachments a ON a.id = pm.attachment_id
           WHERE pm.post_id IN ({})
           ORDER BY pm.position"#,
        placeholders.join(",")
    );
    let mut query = sqlx::query_as::<_, (String, String, String)>(&sql);
    for p in items {
        query = query.bind(&p.id);
    }
    for (post_id, attachment_id, content_type) in query.fetch_all(db).await? {
        media_map.entry(post_id).or_default().push(MediaRef {
            url: config.file_url(&attachment_id),
            id: attachment_id,
            content_type,
        });
    }
    Ok(media_map)
}

async fn attach_media(db: &SqlitePool, config: &Config, items: &mut [Post]) -> Result<(), sqlx::Error> {
    let mut media_map = fetch_media_map(db, config, items).await?;
    for p in items.iter_mut() {
        p.media = media_map.remove(&p.id).unwrap_or_default();
    }
    Ok(())
}

/// One feed page, newest first, strictly older than `cursor`.
///
/// Fetches one extra row to decide `has_more`, so a short page always
/// means the feed is exhausted. The response cursor is the timestamp of the
/// last (oldest) item.
pub async fn page(
    db: &SqlitePool,
    config: &Config,
    category: Option<&str>,
    cursor: Option<&str>,
    limit: i64,
) -> ApiResult<PaginatedResponse<Post>> {
    if let Some(c) = category {
        stride_shared::validation::validate_category(c).map_err(ApiError::Validation)?;
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM posts WHERE 1 = 1");
    if let Some(c) = category {
        qb.push(" AND category = ").push_bind(c);
    }
    if let Some(cur) = cursor {
        qb.push(" AND created_at < ").push_bind(cur);
    }
    qb.push(" ORDER BY created_at DESC LIMIT ").push_bind(limit + 1);

    let mut items = qb.build_query_as::<Post>().fetch_all(db).await?;

    let has_more = items.len() as i64 > limit;
    if has_more {
        items.pop();
    }
    attach_media(db, config, &mut items).await?;

    let cursor = items.last().map(|p| p.created_at.clone());

    Ok(PaginatedResponse {
        items,
        cursor,
        has_more,
    })
}

pub async fn get_post(db: &SqlitePool, config: &Config, post_id: &str) -> ApiResult<Post> {
    let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;
    let mut items = [post];
    attach_media(db, config, &mut items).await?;
    let [post] = items;
    Ok(post)
}

/// Create a post referencing previously uploaded images. One bad media id
/// rejects the whole post and nothing is written.
pub async fn create_post(
    db: &SqlitePool,
    config: &Config,
    author: &AuthUser,
    body: CreatePostRequest,
) -> ApiResult<Post> {
    stride_shared::validation::validate_post_content(&body.content).map_err(ApiError::Validation)?;
    stride_shared::validation::validate_category(&body.category).map_err(ApiError::Validation)?;
    if body.media_ids.len() > MAX_POST_MEDIA {
        return Err(ApiError::Validation(format!(
            "A post can have at most {} images",
            MAX_POST_MEDIA
        )));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = body.media_ids.iter().find(|m| !seen.insert(m.as_str())) {
        return Err(ApiError::Validation(format!("Media {} is listed more than once", dup)));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = db::timestamp();

    let mut tx = db.begin().await?;

    sqlx::query(
        r#"INSERT INTO posts (id, author_id, author_name, category, content, like_count, comment_count, created_at)
           VALUES (?, ?, ?, ?, ?, 0, 0, ?)"#,
    )
    .bind(&id)
    .bind(&author.id)
    .bind(&author.name)
    .bind(&body.category)
    .bind(&body.content)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    for (position, media_id) in body.media_ids.iter().enumerate() {
        let content_type = sqlx::query_scalar::<_, String>(
            "SELECT content_type FROM attachments WHERE id = ? AND uploader_id = ?",
        )
        .bind(media_id)
        .bind(&author.id)
        .fetch_optional(&mut *tx)
        .await?;

        match content_type {
            Some(ct) if ct.starts_with("image/") => {}
            _ => {
                return Err(ApiError::Validation(format!("Unknown media {}", media_id)));
            }
        }

        sqlx::query("INSERT INTO post_media (post_id, attachment_id, position) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(media_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!("Post {} created by {} in {}", id, author.id, body.category);

    get_post(db, config, &id).await
}

pub async fn count_by_author(db: &SqlitePool, author_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE author_id = ?")
        .bind(author_id)
        .fetch_one(db)
        .await
}
