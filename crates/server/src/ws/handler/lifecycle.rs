use crate::models::AuthUser;
use crate::ws::events::ServerEvent;
use crate::ws::gateway::ClientId;
use crate::AppState;

pub async fn send_ready(state: &AppState, client_id: ClientId, user: &AuthUser) {
    tracing::debug!("Client {} connected as {}", client_id, user.id);
    state
        .gateway
        .send_to(client_id, &ServerEvent::Ready { user_id: user.id.clone() })
        .await;
}

pub async fn handle_disconnect(state: &AppState, client_id: ClientId, user: &AuthUser) {
    if let Some(client) = state.gateway.unregister(client_id).await {
        tracing::debug!(
            "Client {} ({}) disconnected, released {} subscriptions",
            client_id,
            user.id,
            client.topics.len()
        );
    }
}
