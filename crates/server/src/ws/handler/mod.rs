mod chat;
mod lifecycle;
mod subscriptions;

use axum::{
    extract::{State, WebSocketUpgrade, ws::{Message, WebSocket}},
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use stride_shared::constants::WS_HEARTBEAT_INTERVAL_MS;
use tokio::sync::mpsc;

use crate::middleware::{resolve_session, session_token_from_headers};
use crate::models::AuthUser;
use crate::ws::events::ClientEvent;
use crate::ws::gateway::{ClientId, Topic};
use crate::ws::subscription::Subscription;
use crate::AppState;

/// Live subscriptions held by one connection, keyed by topic.
type Subscriptions = HashMap<Topic, Subscription>;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    query: axum::extract::Query<HashMap<String, String>>,
    headers: axum::http::HeaderMap,
) -> impl IntoResponse {
    let auth_user = extract_session(&state, &headers, &query).await;
    ws.on_upgrade(move |socket| handle_socket(socket, state, auth_user))
}

async fn extract_session(
    state: &AppState,
    headers: &axum::http::HeaderMap,
    query: &HashMap<String, String>,
) -> Option<AuthUser> {
    let token = query
        .get("token")
        .cloned()
        .filter(|t| !t.is_empty())
        .or_else(|| session_token_from_headers(headers))?;

    match resolve_session(&state.db, &token).await {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::debug!("Gateway connection rejected: {}", e);
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, auth_user: Option<AuthUser>) {
    let user = match auth_user {
        Some(u) => u,
        None => return,
    };

    let client_id = state.gateway.next_client_id().await;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    state
        .gateway
        .register(client_id, user.id.clone(), user.username.clone(), tx)
        .await;

    lifecycle::send_ready(&state, client_id, &user).await;

    // Forward queued events to the socket and keep idle connections alive.
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(Duration::from_millis(WS_HEARTBEAT_INTERVAL_MS));
        heartbeat.tick().await;
        loop {
            let outgoing = tokio::select! {
                msg = rx.recv() => match msg {
                    Some(text) => Message::Text(text.into()),
                    None => break,
                },
                _ = heartbeat.tick() => Message::Ping(Vec::new().into()),
            };
            if ws_tx.send(outgoing).await.is_err() {
                break;
            }
        }
    });

    // Receive loop. It owns the connection's subscriptions, so they are
    // released when the loop ends or is aborted.
    let state_clone = state.clone();
    let user_clone = user.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut subscriptions = Subscriptions::new();
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Text(text) => {
                    let text_str: &str = &text;
                    match serde_json::from_str::<ClientEvent>(text_str) {
                        Ok(event) => {
                            handle_client_event(
                                &state_clone,
                                client_id,
                                &user_clone,
                                &mut subscriptions,
                                event,
                            )
                            .await;
                        }
                        Err(e) => {
                            tracing::debug!("Ignoring malformed event from {}: {}", client_id, e);
                        }
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    lifecycle::handle_disconnect(&state, client_id, &user).await;
}

async fn handle_client_event(
    state: &Arc<AppState>,
    client_id: ClientId,
    user: &AuthUser,
    subscriptions: &mut Subscriptions,
    event: ClientEvent,
) {
    match event {
        ClientEvent::SubscribeDirectory => {
            subscriptions::subscribe_directory(state, client_id, user, subscriptions).await;
        }
        ClientEvent::UnsubscribeDirectory => {
            subscriptions::unsubscribe(subscriptions, &Topic::Directory(user.id.clone())).await;
        }
        ClientEvent::SubscribeConversation { conversation_id } => {
            subscriptions::subscribe_conversation(state, client_id, user, subscriptions, conversation_id).await;
        }
        ClientEvent::UnsubscribeConversation { conversation_id } => {
            subscriptions::unsubscribe(subscriptions, &Topic::Conversation(conversation_id)).await;
        }
        ClientEvent::SubscribeFeed { category } => {
            subscriptions::subscribe_feed(state, client_id, subscriptions, category).await;
        }
        ClientEvent::UnsubscribeFeed { category } => {
            subscriptions::unsubscribe(subscriptions, &Topic::Feed(category)).await;
        }
        ClientEvent::SendMessage { conversation_id, content } => {
            chat::handle_send_message(state, client_id, user, conversation_id, content).await;
        }
        ClientEvent::MarkRead { conversation_id } => {
            chat::handle_mark_read(state, client_id, user, conversation_id).await;
        }
        ClientEvent::TypingStart { conversation_id } => {
            chat::handle_typing(state, client_id, user, &conversation_id, true).await;
        }
        ClientEvent::TypingStop { conversation_id } => {
            chat::handle_typing(state, client_id, user, &conversation_id, false).await;
        }
        ClientEvent::Ping => {}
    }
}
