use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ConversationKind {
    Direct,
    Group,
    Team,
}

impl ConversationKind {
    /// Direct conversations have a fixed pair of participants.
    pub fn accepts_new_participants(self) -> bool {
        !matches!(self, ConversationKind::Direct)
    }

    pub fn requires_name(self) -> bool {
        !matches!(self, ConversationKind::Direct)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConversationRow {
    pub id: String,
    pub kind: ConversationKind,
    pub name: Option<String>,
    pub last_message_content: Option<String>,
    pub last_message_sender_id: Option<String>,
    pub last_message_at: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub content: String,
    pub sender_id: String,
    pub sent_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub conversation_id: String,
    pub user_id: String,
    pub username: String,
    pub name: String,
    pub image: Option<String>,
    pub unread_count: i64,
}

/// A conversation as seen by one participant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: String,
    pub kind: ConversationKind,
    pub name: Option<String>,
    pub participants: Vec<ParticipantSummary>,
    pub last_message: Option<LastMessage>,
    /// The viewer's own unread counter.
    pub unread_count: i64,
    pub unread_counts: BTreeMap<String, i64>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl ConversationView {
    pub fn from_row(row: ConversationRow, participants: Vec<ParticipantSummary>, viewer_id: &str) -> Self {
        let unread_counts: BTreeMap<String, i64> = participants
            .iter()
            .map(|p| (p.user_id.clone(), p.unread_count))
            .collect();
        let unread_count = unread_counts.get(viewer_id).copied().unwrap_or(0);
        let last_message = match (row.last_message_content, row.last_message_sender_id, row.last_message_at) {
            (Some(content), Some(sender_id), Some(sent_at)) => Some(LastMessage {
                content,
                sender_id,
                sent_at,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            kind: row.kind,
            name: row.name,
            participants,
            last_message,
            unread_count,
            unread_counts,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub kind: ConversationKind,
    pub participant_ids: Vec<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddParticipantRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub conversation_id: String,
    pub unread_count: i64,
    /// Messages newly added to the caller's read-by set.
    pub marked: u64,
}
