#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

pub type TestSocket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Start the test app on a random TCP port and return the base URL.
pub async fn start_server() -> (String, sqlx::SqlitePool) {
    let pool = super::setup_test_db().await;
    let app = super::create_test_app(pool.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://127.0.0.1:{}", addr.port());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    (base, pool)
}

/// Connect a WebSocket with a session token and consume the `ready` event.
pub async fn ws_connect(base: &str, token: &str) -> TestSocket {
    let ws_url = format!(
        "{}/gateway?token={}",
        base.replace("http://", "ws://"),
        token
    );
    let (mut ws, _) = tokio_tungstenite::connect_async(&ws_url).await.unwrap();
    let ready = recv_json(&mut ws).await.expect("ready event");
    assert_eq!(ready["type"], "ready");
    ws
}

/// Read next text message parsed as JSON, with timeout.
pub async fn recv_json(ws: &mut TestSocket) -> Option<Value> {
    let timeout = tokio::time::timeout(std::time::Duration::from_secs(3), ws.next()).await;
    match timeout {
        Ok(Some(Ok(Message::Text(text)))) => serde_json::from_str(&text).ok(),
        _ => None,
    }
}

/// Skip messages until one of the given `type` arrives.
pub async fn recv_event(ws: &mut TestSocket, event_type: &str) -> Option<Value> {
    loop {
        let msg = recv_json(ws).await?;
        if msg["type"] == event_type {
            return Some(msg);
        }
    }
}

/// Drain all pending messages until timeout.
pub async fn drain_messages(ws: &mut TestSocket) -> Vec<Value> {
    let mut messages = Vec::new();
    loop {
        let timeout =
            tokio::time::timeout(std::time::Duration::from_millis(200), ws.next()).await;
        match timeout {
            Ok(Some(Ok(Message::Text(text)))) => {
                if let Ok(v) = serde_json::from_str::<Value>(&text) {
                    messages.push(v);
                }
            }
            _ => break,
        }
    }
    messages
}

/// Send a JSON message over WebSocket.
pub async fn send_json(ws: &mut TestSocket, value: &Value) {
    ws.send(Message::Text(serde_json::to_string(value).unwrap().into()))
        .await
        .unwrap();
}

/// Like `start_server`, but served through `axum_test` over a real socket so
/// a test can drive REST calls and WebSocket clients against the same app.
pub async fn start_http_server() -> (axum_test::TestServer, String, sqlx::SqlitePool) {
    let pool = super::setup_test_db().await;
    let app = super::create_test_app(pool.clone());

    let server = axum_test::TestServer::builder()
        .http_transport()
        .build(app)
        .unwrap();
    let base = server
        .server_address()
        .expect("http transport has an address")
        .to_string()
        .trim_end_matches('/')
        .to_string();

    (server, base, pool)
}
