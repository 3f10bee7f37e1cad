use std::sync::Arc;

use crate::chat::{directory, live};
use crate::models::AuthUser;
use crate::ws::events::ServerEvent;
use crate::ws::gateway::{ClientId, Topic};
use crate::AppState;

use super::Subscriptions;

/// Register `topic` unless this connection already holds it. Returns false
/// when it was already held.
async fn hold(
    state: &Arc<AppState>,
    client_id: ClientId,
    subscriptions: &mut Subscriptions,
    topic: Topic,
) -> bool {
    if subscriptions.contains_key(&topic) {
        return false;
    }
    let sub = state.gateway.subscribe(client_id, topic.clone()).await;
    subscriptions.insert(topic, sub);
    true
}

pub async fn subscribe_directory(
    state: &Arc<AppState>,
    client_id: ClientId,
    user: &AuthUser,
    subscriptions: &mut Subscriptions,
) {
    hold(state, client_id, subscriptions, Topic::Directory(user.id.clone())).await;
    live::deliver_directory(state, client_id, &user.id).await;
}

pub async fn subscribe_conversation(
    state: &Arc<AppState>,
    client_id: ClientId,
    user: &AuthUser,
    subscriptions: &mut Subscriptions,
    conversation_id: String,
) {
    if let Err(e) = directory::ensure_participant(&state.db, &conversation_id, &user.id).await {
        state
            .gateway
            .send_to(client_id, &ServerEvent::Error { message: e.public_message() })
            .await;
        return;
    }

    hold(state, client_id, subscriptions, Topic::Conversation(conversation_id.clone())).await;
    live::deliver_window(state, client_id, &conversation_id).await;
}

pub async fn subscribe_feed(
    state: &Arc<AppState>,
    client_id: ClientId,
    subscriptions: &mut Subscriptions,
    category: Option<String>,
) {
    if let Some(ref c) = category {
        if let Err(message) = stride_shared::validation::validate_category(c) {
            state
                .gateway
                .send_to(client_id, &ServerEvent::Error { message })
                .await;
            return;
        }
    }
    hold(state, client_id, subscriptions, Topic::Feed(category)).await;
}

pub async fn unsubscribe(subscriptions: &mut Subscriptions, topic: &Topic) {
    if let Some(sub) = subscriptions.remove(topic) {
        sub.cancel().await;
    }
}
