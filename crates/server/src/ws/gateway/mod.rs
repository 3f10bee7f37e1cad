mod broadcast;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::ws::subscription::Subscription;

pub type ClientId = u64;

/// What a live subscription listens to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// The conversation list of one user.
    Directory(String),
    /// The message window of one conversation.
    Conversation(String),
    /// New posts, optionally restricted to one category.
    Feed(Option<String>),
}

pub struct ConnectedClient {
    pub user_id: String,
    pub username: String,
    pub tx: mpsc::UnboundedSender<String>,
    pub topics: HashSet<Topic>,
}

pub struct GatewayState {
    next_id: RwLock<u64>,
    pub clients: RwLock<HashMap<ClientId, ConnectedClient>>,
    pub topic_subs: RwLock<HashMap<Topic, HashSet<ClientId>>>,
}

impl Default for GatewayState {
    fn default() -> Self {
        Self::new()
    }
}

// Lock order: `topic_subs` before `clients` whenever both are held.
impl GatewayState {
    pub fn new() -> Self {
        Self {
            next_id: RwLock::new(1),
            clients: RwLock::new(HashMap::new()),
            topic_subs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn next_client_id(&self) -> ClientId {
        let mut id = self.next_id.write().await;
        let current = *id;
        *id += 1;
        current
    }

    pub async fn register(
        &self,
        client_id: ClientId,
        user_id: String,
        username: String,
        tx: mpsc::UnboundedSender<String>,
    ) {
        let client = ConnectedClient {
            user_id,
            username,
            tx,
            topics: HashSet::new(),
        };
        self.clients.write().await.insert(client_id, client);
    }

    /// Remove a client and every subscription it still holds.
    pub async fn unregister(&self, client_id: ClientId) -> Option<ConnectedClient> {
        let client = self.clients.write().await.remove(&client_id)?;

        let mut subs = self.topic_subs.write().await;
        for topic in &client.topics {
            if let Some(set) = subs.get_mut(topic) {
                set.remove(&client_id);
                if set.is_empty() {
                    subs.remove(topic);
                }
            }
        }

        Some(client)
    }

    /// Start delivering `topic` to `client_id`. The returned handle owns the
    /// subscription: cancelling or dropping it stops delivery.
    pub async fn subscribe(self: &Arc<Self>, client_id: ClientId, topic: Topic) -> Subscription {
        self.topic_subs
            .write()
            .await
            .entry(topic.clone())
            .or_default()
            .insert(client_id);

        if let Some(client) = self.clients.write().await.get_mut(&client_id) {
            client.topics.insert(topic.clone());
        }

        Subscription::new(Arc::clone(self), client_id, topic)
    }

    pub(crate) async fn remove_subscriber(&self, client_id: ClientId, topic: &Topic) {
        let mut subs = self.topic_subs.write().await;
        if let Some(set) = subs.get_mut(topic) {
            set.remove(&client_id);
            if set.is_empty() {
                subs.remove(topic);
            }
        }
        drop(subs);

        if let Some(client) = self.clients.write().await.get_mut(&client_id) {
            client.topics.remove(topic);
        }
    }

    pub async fn has_subscribers(&self, topic: &Topic) -> bool {
        self.topic_subs
            .read()
            .await
            .get(topic)
            .is_some_and(|set| !set.is_empty())
    }

    pub async fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topic_subs
            .read()
            .await
            .get(topic)
            .map_or(0, HashSet::len)
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }
}
