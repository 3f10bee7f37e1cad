use serde::Serialize;

use crate::models::{ConversationView, Message, Post};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Ready {
        #[serde(rename = "userId")]
        user_id: String,
    },
    /// Full, re-sorted conversation list of the receiving user.
    Directory {
        conversations: Vec<ConversationView>,
    },
    /// Latest message window of a conversation, oldest first.
    Messages {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        messages: Vec<Message>,
    },
    PostCreated {
        post: Post,
    },
    Typing {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        active: bool,
    },
    Error {
        message: String,
    },
}
