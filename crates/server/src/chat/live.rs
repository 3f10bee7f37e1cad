//! Re-delivery of chat state to live subscribers.
//!
//! Subscribers always receive full snapshots (the whole directory, the whole
//! message window) rather than deltas. A snapshot that fails to load is
//! delivered as an empty list.

use stride_shared::constants::MESSAGE_PAGE_SIZE;

use crate::chat::{directory, stream};
use crate::models::{ConversationView, Message};
use crate::ws::events::ServerEvent;
use crate::ws::gateway::{ClientId, Topic};
use crate::AppState;

async fn directory_snapshot(state: &AppState, user_id: &str) -> Vec<ConversationView> {
    directory::list_for_user(&state.db, user_id)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Directory snapshot for {} failed: {}", user_id, e);
            Vec::new()
        })
}

async fn window_snapshot(state: &AppState, conversation_id: &str) -> Vec<Message> {
    stream::window(&state.db, conversation_id, MESSAGE_PAGE_SIZE)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Message window for {} failed: {}", conversation_id, e);
            Vec::new()
        })
}

/// Initial delivery right after a client subscribes to its directory.
pub async fn deliver_directory(state: &AppState, client_id: ClientId, user_id: &str) {
    let conversations = directory_snapshot(state, user_id).await;
    state
        .gateway
        .send_to(client_id, &ServerEvent::Directory { conversations })
        .await;
}

/// Initial delivery right after a client subscribes to a conversation.
pub async fn deliver_window(state: &AppState, client_id: ClientId, conversation_id: &str) {
    let messages = window_snapshot(state, conversation_id).await;
    state
        .gateway
        .send_to(
            client_id,
            &ServerEvent::Messages {
                conversation_id: conversation_id.to_string(),
                messages,
            },
        )
        .await;
}

/// Push the current message window to every subscriber of the conversation.
pub async fn publish_window(state: &AppState, conversation_id: &str) {
    let topic = Topic::Conversation(conversation_id.to_string());
    if !state.gateway.has_subscribers(&topic).await {
        return;
    }
    let messages = window_snapshot(state, conversation_id).await;
    state
        .gateway
        .broadcast_topic(
            &topic,
            &ServerEvent::Messages {
                conversation_id: conversation_id.to_string(),
                messages,
            },
            None,
        )
        .await;
}

/// Push a re-sorted directory to every participant subscribed to theirs.
pub async fn publish_directories(state: &AppState, conversation_id: &str) {
    let participants = match directory::participant_ids(&state.db, conversation_id).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("Participants of {} unavailable: {}", conversation_id, e);
            return;
        }
    };

    for user_id in participants {
        publish_directory(state, &user_id).await;
    }
}

pub async fn publish_directory(state: &AppState, user_id: &str) {
    let topic = Topic::Directory(user_id.to_string());
    if !state.gateway.has_subscribers(&topic).await {
        return;
    }
    let conversations = directory_snapshot(state, user_id).await;
    state
        .gateway
        .broadcast_topic(&topic, &ServerEvent::Directory { conversations }, None)
        .await;
}

/// Everything a conversation's viewers need after it changed.
pub async fn publish_conversation_changed(state: &AppState, conversation_id: &str) {
    publish_window(state, conversation_id).await;
    publish_directories(state, conversation_id).await;
}
