use std::collections::{BTreeSet, HashMap};

use sqlx::SqlitePool;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    AuthUser, ConversationKind, ConversationRow, ConversationView, CreateConversationRequest,
    ParticipantSummary,
};

/// Most recent activity first. Conversations that never saw a message have no
/// `updated_at` and sort after every conversation that did.
pub fn sort_by_recency(views: &mut [ConversationView]) {
    // Option orders None below Some, so a descending compare puts None last.
    views.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Fetch a conversation and check that `user_id` takes part in it.
pub async fn ensure_participant(
    db: &SqlitePool,
    conversation_id: &str,
    user_id: &str,
) -> ApiResult<ConversationRow> {
    let row = sqlx::query_as::<_, ConversationRow>("SELECT * FROM conversations WHERE id = ?")
        .bind(conversation_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Conversation not found".into()))?;

    let is_participant = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM conversation_participants WHERE conversation_id = ? AND user_id = ?",
    )
    .bind(conversation_id)
    .bind(user_id)
    .fetch_one(db)
    .await?;

    if is_participant == 0 {
        return Err(ApiError::not_participant());
    }
    Ok(row)
}

pub async fn participant_ids(db: &SqlitePool, conversation_id: &str) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT user_id FROM conversation_participants WHERE conversation_id = ? ORDER BY joined_at, user_id",
    )
    .bind(conversation_id)
    .fetch_all(db)
    .await
}

/// Batch-fetch participant summaries keyed by conversation id.
async fn fetch_participant_map(
    db: &SqlitePool,
    conversation_ids: &[&str],
) -> Result<HashMap<String, Vec<ParticipantSummary>>, sqlx::Error> {
    let mut map: HashMap<String, Vec<ParticipantSummary>> = HashMap::new();
    if conversation_ids.is_empty() {
        return Ok(map);
    }

    let placeholders: Vec<&str> = conversation_ids.iter().map(|_| "?").collect();
    let sql = format!(
        r#"SELECT p.conversation_id, p.user_id, u.username, u.name, u.image, p.unread_count
           FROM conversation_participants p
           JOIN "user" u ON u.id = p.user_id
           WHERE p.conversation_id IN ({})
           ORDER BY p.joined_at, p.user_id"#,
        placeholders.join(",")
    );
    let mut query = sqlx::query_as::<_, ParticipantSummary>(&sql);
    for id in conversation_ids {
        query = query.bind(*id);
    }
    for participant in query.fetch_all(db).await? {
        map.entry(participant.conversation_id.clone())
            .or_default()
            .push(participant);
    }
    Ok(map)
}

/// Every conversation `user_id` participates in, most recent activity first.
pub async fn list_for_user(db: &SqlitePool, user_id: &str) -> ApiResult<Vec<ConversationView>> {
    let rows = sqlx::query_as::<_, ConversationRow>(
        r#"SELECT c.* FROM conversations c
           JOIN conversation_participants p ON p.conversation_id = c.id
           WHERE p.user_id = ?"#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    let mut participants = fetch_participant_map(db, &ids).await?;

    let mut views: Vec<ConversationView> = rows
        .into_iter()
        .map(|row| {
            let members = participants.remove(&row.id).unwrap_or_default();
            ConversationView::from_row(row, members, user_id)
        })
        .collect();
    sort_by_recency(&mut views);
    Ok(views)
}

pub async fn get_for_user(
    db: &SqlitePool,
    conversation_id: &str,
    user_id: &str,
) -> ApiResult<ConversationView> {
    let row = ensure_participant(db, conversation_id, user_id).await?;
    let mut participants = fetch_participant_map(db, &[conversation_id]).await?;
    let members = participants.remove(conversation_id).unwrap_or_default();
    Ok(ConversationView::from_row(row, members, user_id))
}

/// Canonical key for the unordered pair of a direct conversation.
pub fn direct_key(a: &str, b: &str) -> String {
    if a < b {
        format!("{}:{}", a, b)
    } else {
        format!("{}:{}", b, a)
    }
}

async fn ensure_users_exist(db: &SqlitePool, user_ids: &BTreeSet<String>) -> ApiResult<()> {
    for id in user_ids {
        let exists = sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM "user" WHERE id = ?"#)
            .bind(id)
            .fetch_one(db)
            .await?;
        if exists == 0 {
            return Err(ApiError::NotFound(format!("User {} not found", id)));
        }
    }
    Ok(())
}

/// Create a conversation. Returns the view and whether a new row was written;
/// a direct conversation with the same pair is returned as-is.
pub async fn create(
    db: &SqlitePool,
    creator: &AuthUser,
    body: CreateConversationRequest,
) -> ApiResult<(ConversationView, bool)> {
    let others: BTreeSet<String> = body
        .participant_ids
        .into_iter()
        .filter(|id| id != &creator.id)
        .collect();

    if others.is_empty() {
        return Err(ApiError::Validation(
            "At least one other participant is required".into(),
        ));
    }

    let name = match body.kind {
        ConversationKind::Direct => {
            if others.len() != 1 {
                return Err(ApiError::Validation(
                    "A direct conversation has exactly one other participant".into(),
                ));
            }
            None
        }
        kind => {
            let name = body.name.unwrap_or_default();
            if kind.requires_name() {
                stride_shared::validation::validate_conversation_name(&name)
                    .map_err(ApiError::Validation)?;
            }
            Some(name.trim().to_string())
        }
    };

    ensure_users_exist(db, &others).await?;

    let key = match body.kind {
        ConversationKind::Direct => others.iter().next().map(|other| direct_key(&creator.id, other)),
        _ => None,
    };

    if let Some(ref key) = key {
        let existing = sqlx::query_scalar::<_, String>("SELECT id FROM conversations WHERE direct_key = ?")
            .bind(key)
            .fetch_optional(db)
            .await?;
        if let Some(id) = existing {
            return Ok((get_for_user(db, &id, &creator.id).await?, false));
        }
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = db::timestamp();

    let mut tx = db.begin().await?;

    let inserted = sqlx::query(
        r#"INSERT INTO conversations (id, kind, name, direct_key, created_by, created_at)
           VALUES (?, ?, ?, ?, ?, ?)
           ON CONFLICT(direct_key) DO NOTHING"#,
    )
    .bind(&id)
    .bind(body.kind)
    .bind(&name)
    .bind(&key)
    .bind(&creator.id)
    .bind(&now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if inserted == 0 {
        // Lost a race with a concurrent create of the same direct pair.
        tx.rollback().await?;
        let existing = sqlx::query_scalar::<_, String>("SELECT id FROM conversations WHERE direct_key = ?")
            .bind(&key)
            .fetch_one(db)
            .await?;
        return Ok((get_for_user(db, &existing, &creator.id).await?, false));
    }

    for user_id in std::iter::once(&creator.id).chain(others.iter()) {
        sqlx::query(
            "INSERT INTO conversation_participants (conversation_id, user_id, unread_count, joined_at) VALUES (?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        "Conversation {} ({:?}) created by {} with {} participants",
        id,
        body.kind,
        creator.id,
        others.len() + 1
    );

    Ok((get_for_user(db, &id, &creator.id).await?, true))
}

/// Add a member to a group or team conversation. Adding an existing member is a no-op.
pub async fn add_participant(
    db: &SqlitePool,
    caller: &AuthUser,
    conversation_id: &str,
    new_user_id: &str,
) -> ApiResult<ConversationView> {
    let row = ensure_participant(db, conversation_id, &caller.id).await?;
    if !row.kind.accepts_new_participants() {
        return Err(ApiError::Validation(
            "Direct conversations cannot gain participants".into(),
        ));
    }

    ensure_users_exist(db, &BTreeSet::from([new_user_id.to_string()])).await?;

    sqlx::query(
        "INSERT OR IGNORE INTO conversation_participants (conversation_id, user_id, unread_count, joined_at) VALUES (?, ?, 0, ?)",
    )
    .bind(conversation_id)
    .bind(new_user_id)
    .bind(db::timestamp())
    .execute(db)
    .await?;

    get_for_user(db, conversation_id, &caller.id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn view(id: &str, created_at: &str, updated_at: Option<&str>) -> ConversationView {
        ConversationView {
            id: id.into(),
            kind: ConversationKind::Group,
            name: Some(id.into()),
            participants: Vec::new(),
            last_message: None,
            unread_count: 0,
            unread_counts: BTreeMap::new(),
            created_by: "u1".into(),
            created_at: created_at.into(),
            updated_at: updated_at.map(Into::into),
        }
    }

    #[test]
    fn recency_sort_puts_missing_timestamps_last() {
        let mut views = vec![
            view("never", "2024-01-03T00:00:00.000000Z", None),
            view("old", "2024-01-01T00:00:00.000000Z", Some("2024-01-02T00:00:00.000000Z")),
            view("new", "2024-01-01T00:00:00.000000Z", Some("2024-01-05T00:00:00.000000Z")),
        ];
        sort_by_recency(&mut views);
        let ids: Vec<&str> = views.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["new", "old", "never"]);
    }

    #[test]
    fn recency_sort_breaks_ties_by_creation() {
        let mut views = vec![
            view("a", "2024-01-01T00:00:00.000000Z", None),
            view("b", "2024-01-02T00:00:00.000000Z", None),
        ];
        sort_by_recency(&mut views);
        assert_eq!(views[0].id, "b");
    }

    #[test]
    fn direct_key_is_order_independent() {
        assert_eq!(direct_key("alice", "bob"), direct_key("bob", "alice"));
        assert_eq!(direct_key("alice", "bob"), "alice:bob");
    }
}
