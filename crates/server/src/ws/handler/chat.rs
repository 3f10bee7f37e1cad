use crate::chat::{live, stream, unread};
use crate::models::AuthUser;
use crate::ws::events::ServerEvent;
use crate::ws::gateway::{ClientId, Topic};
use crate::AppState;

pub async fn handle_send_message(
    state: &AppState,
    client_id: ClientId,
    user: &AuthUser,
    conversation_id: String,
    content: String,
) {
    match stream::send_message(&state.db, user, &conversation_id, &content).await {
        Ok(_) => live::publish_conversation_changed(state, &conversation_id).await,
        Err(e) => {
            if e.status().is_server_error() {
                tracing::error!("Failed to send message: {}", e);
            }
            state
                .gateway
                .send_to(client_id, &ServerEvent::Error { message: e.public_message() })
                .await;
        }
    }
}

pub async fn handle_mark_read(
    state: &AppState,
    client_id: ClientId,
    user: &AuthUser,
    conversation_id: String,
) {
    match unread::mark_read(&state.db, &user.id, &conversation_id).await {
        Ok(outcome) => {
            // Read-by sets only changed if something was newly marked.
            if outcome.marked > 0 {
                live::publish_window(state, &conversation_id).await;
            }
            live::publish_directory(state, &user.id).await;
        }
        Err(e) => {
            state
                .gateway
                .send_to(client_id, &ServerEvent::Error { message: e.public_message() })
                .await;
        }
    }
}

pub async fn handle_typing(
    state: &AppState,
    client_id: ClientId,
    user: &AuthUser,
    conversation_id: &str,
    active: bool,
) {
    // Only clients viewing the conversation (a participant-checked
    // subscription) may announce typing in it.
    let topic = Topic::Conversation(conversation_id.to_string());
    let viewing = state
        .gateway
        .clients
        .read()
        .await
        .get(&client_id)
        .is_some_and(|c| c.topics.contains(&topic));
    if !viewing {
        return;
    }

    state
        .gateway
        .broadcast_topic(
            &topic,
            &ServerEvent::Typing {
                conversation_id: conversation_id.to_string(),
                user_id: user.id.clone(),
                active,
            },
            Some(client_id),
        )
        .await;
}
