use sqlx::SqlitePool;

use crate::chat::directory;
use crate::db;
use crate::error::ApiResult;
use crate::models::MarkReadResponse;

/// Mark every message of the conversation as read by `user_id` and reset
/// their unread counter.
///
/// Not transactional: both statements are idempotent (set insert, reset to
/// zero), so repeated or concurrent calls from several devices converge.
pub async fn mark_read(
    db: &SqlitePool,
    user_id: &str,
    conversation_id: &str,
) -> ApiResult<MarkReadResponse> {
    directory::ensure_participant(db, conversation_id, user_id).await?;

    let marked = sqlx::query(
        r#"INSERT OR IGNORE INTO message_reads (message_id, user_id, read_at)
           SELECT id, ?, ? FROM messages WHERE conversation_id = ?"#,
    )
    .bind(user_id)
    .bind(db::timestamp())
    .bind(conversation_id)
    .execute(db)
    .await?
    .rows_affected();

    sqlx::query(
        "UPDATE conversation_participants SET unread_count = 0 WHERE conversation_id = ? AND user_id = ?",
    )
    .bind(conversation_id)
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(MarkReadResponse {
        conversation_id: conversation_id.to_string(),
        unread_count: 0,
        marked,
    })
}

/// Sum of a user's unread counters across all conversations.
pub async fn total_unread(db: &SqlitePool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(unread_count), 0) FROM conversation_participants WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_one(db)
    .await
}
