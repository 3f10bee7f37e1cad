mod server_event;

pub use server_event::ServerEvent;

use serde::Deserialize;

// ── Client → Server Events ──

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    SubscribeDirectory,
    UnsubscribeDirectory,
    SubscribeConversation {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    UnsubscribeConversation {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    SubscribeFeed {
        #[serde(default)]
        category: Option<String>,
    },
    UnsubscribeFeed {
        #[serde(default)]
        category: Option<String>,
    },
    SendMessage {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        content: String,
    },
    MarkRead {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    TypingStart {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    TypingStop {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unit_and_struct_events() {
        let e: ClientEvent = serde_json::from_str(r#"{"type":"subscribe_directory"}"#).unwrap();
        assert!(matches!(e, ClientEvent::SubscribeDirectory));

        let e: ClientEvent =
            serde_json::from_str(r#"{"type":"send_message","conversationId":"c1","content":"hi"}"#)
                .unwrap();
        match e {
            ClientEvent::SendMessage { conversation_id, content } => {
                assert_eq!(conversation_id, "c1");
                assert_eq!(content, "hi");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn feed_category_is_optional() {
        let e: ClientEvent = serde_json::from_str(r#"{"type":"subscribe_feed"}"#).unwrap();
        assert!(matches!(e, ClientEvent::SubscribeFeed { category: None }));
    }
}
