use std::sync::Arc;

use super::gateway::{ClientId, GatewayState, Topic};

/// Owned handle for one live subscription.
///
/// Delivery stops when the handle is cancelled or dropped, so a connection
/// that goes away takes its listeners with it.
pub struct Subscription {
    gateway: Arc<GatewayState>,
    client_id: ClientId,
    topic: Topic,
    active: bool,
}

impl Subscription {
    pub(crate) fn new(gateway: Arc<GatewayState>, client_id: ClientId, topic: Topic) -> Self {
        Self {
            gateway,
            client_id,
            topic,
            active: true,
        }
    }

    pub async fn cancel(mut self) {
        self.active = false;
        self.gateway
            .remove_subscriber(self.client_id, &self.topic)
            .await;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        let gateway = Arc::clone(&self.gateway);
        let client_id = self.client_id;
        let topic = self.topic.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    gateway.remove_subscriber(client_id, &topic).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    "Subscription {:?} for client {} dropped outside a runtime",
                    self.topic,
                    client_id
                );
            }
        }
    }
}
