use super::{ClientId, GatewayState, Topic};
use crate::ws::events::ServerEvent;

impl GatewayState {
    pub async fn broadcast_topic(&self, topic: &Topic, event: &ServerEvent, exclude: Option<ClientId>) {
        let msg = match serde_json::to_string(event) {
            Ok(m) => m,
            Err(_) => return,
        };

        let subs = self.topic_subs.read().await;
        let clients = self.clients.read().await;

        if let Some(subscriber_ids) = subs.get(topic) {
            for &cid in subscriber_ids {
                if Some(cid) == exclude {
                    continue;
                }
                if let Some(client) = clients.get(&cid) {
                    let _ = client.tx.send(msg.clone());
                }
            }
        }
    }

    pub async fn send_to(&self, client_id: ClientId, event: &ServerEvent) {
        let msg = match serde_json::to_string(event) {
            Ok(m) => m,
            Err(_) => return,
        };

        let clients = self.clients.read().await;
        if let Some(client) = clients.get(&client_id) {
            let _ = client.tx.send(msg);
        }
    }
}
