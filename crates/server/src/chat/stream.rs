use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::chat::directory;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{AuthUser, Message, PaginatedResponse};

/// Attach each message's read-by set.
async fn attach_read_by(db: &SqlitePool, items: &mut [Message]) -> Result<(), sqlx::Error> {
    if items.is_empty() {
        return Ok(());
    }

    let placeholders: Vec<&str> = items.iter().map(|_| "?").collect();
    let sql = format!(
        "SELECT message_id, user_id FROM message_reads WHERE message_id IN ({}) ORDER BY read_at, user_id",
        placeholders.join(",")
    );
    let mut query = sqlx::query_as::<_, (String, String)>(&sql);
    for m in items.iter() {
        query = query.bind(&m.id);
    }

    let mut read_map: HashMap<String, Vec<String>> = HashMap::new();
    for (message_id, user_id) in query.fetch_all(db).await? {
        read_map.entry(message_id).or_default().push(user_id);
    }
    for m in items.iter_mut() {
        m.read_by = read_map.remove(&m.id).unwrap_or_default();
    }
    Ok(())
}

/// The latest `limit` messages of a conversation, oldest first.
pub async fn window(
    db: &SqlitePool,
    conversation_id: &str,
    limit: i64,
) -> Result<Vec<Message>, sqlx::Error> {
    let mut items = sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE conversation_id = ? ORDER BY created_at DESC LIMIT ?",
    )
    .bind(conversation_id)
    .bind(limit)
    .fetch_all(db)
    .await?;
    items.reverse();
    attach_read_by(db, &mut items).await?;
    Ok(items)
}

/// One page of history walking backwards from `cursor`, returned oldest first.
/// The response cursor is the oldest timestamp on the page.
pub async fn page(
    db: &SqlitePool,
    conversation_id: &str,
    cursor: Option<&str>,
    limit: i64,
) -> Result<PaginatedResponse<Message>, sqlx::Error> {
    let items = if let Some(cursor) = cursor {
        sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE conversation_id = ? AND created_at < ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(conversation_id)
        .bind(cursor)
        .bind(limit + 1)
        .fetch_all(db)
        .await?
    } else {
        sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(conversation_id)
        .bind(limit + 1)
        .fetch_all(db)
        .await?
    };

    let has_more = items.len() as i64 > limit;
    let mut items = items;
    if has_more {
        items.pop();
    }
    items.reverse(); // chronological order
    attach_read_by(db, &mut items).await?;

    let cursor = items.first().map(|m| m.created_at.clone());

    Ok(PaginatedResponse {
        items,
        cursor,
        has_more,
    })
}

/// Append a message and update everything derived from it as one unit:
/// the sender joins the read-by set, the conversation snapshot and update
/// time move to this message, and every other participant gains one unread.
/// The sender's own counter is left as it was.
pub async fn send_message(
    db: &SqlitePool,
    sender: &AuthUser,
    conversation_id: &str,
    content: &str,
) -> ApiResult<Message> {
    stride_shared::validation::validate_message_content(content).map_err(ApiError::Validation)?;

    directory::ensure_participant(db, conversation_id, &sender.id).await?;

    let id = uuid::Uuid::new_v4().to_string();

    // Stamp under the write lock so commit order matches timestamp order.
    let mut tx = db::begin_write(db).await?;
    let now = db::timestamp();

    sqlx::query(
        r#"INSERT INTO messages (id, conversation_id, sender_id, sender_name, content, created_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(conversation_id)
    .bind(&sender.id)
    .bind(&sender.name)
    .bind(content)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO message_reads (message_id, user_id, read_at) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(&sender.id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"UPDATE conversations
           SET last_message_content = ?, last_message_sender_id = ?, last_message_at = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(content)
    .bind(&sender.id)
    .bind(&now)
    .bind(&now)
    .bind(conversation_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE conversation_participants SET unread_count = unread_count + 1 WHERE conversation_id = ? AND user_id != ?",
    )
    .bind(conversation_id)
    .bind(&sender.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::debug!("Message {} appended to conversation {}", id, conversation_id);

    Ok(Message {
        id,
        conversation_id: conversation_id.to_string(),
        sender_id: sender.id.clone(),
        sender_name: sender.name.clone(),
        content: content.to_string(),
        created_at: now,
        read_by: vec![sender.id.clone()],
    })
}
