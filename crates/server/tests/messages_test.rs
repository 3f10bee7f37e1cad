mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::auth_header;
use serde_json::{json, Value};
use stride_server::chat::stream;
use stride_server::models::AuthUser;

async fn setup() -> (TestServer, sqlx::SqlitePool) {
    let pool = common::setup_test_db().await;
    let app = common::create_test_app(pool.clone());
    let server = TestServer::new(app).unwrap();
    (server, pool)
}

async fn send(server: &TestServer, token: &str, conversation_id: &str, content: &str) -> Value {
    let (h, v) = auth_header(token);
    let res = server
        .post(&format!("/api/conversations/{}/messages", conversation_id))
        .add_header(h, v)
        .json(&json!({ "content": content }))
        .await;
    res.assert_status(StatusCode::CREATED);
    res.json()
}

async fn directory_entry(server: &TestServer, token: &str, conversation_id: &str) -> Value {
    let (h, v) = auth_header(token);
    let res = server.get("/api/conversations").add_header(h, v).await;
    res.assert_status_ok();
    res.json::<Value>()
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == conversation_id)
        .cloned()
        .expect("conversation in directory")
}

#[tokio::test]
async fn send_updates_snapshot_and_read_by() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice", "pass1234").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob@test.com", "bob", "pass1234").await;
    let conv = common::create_test_conversation(&pool, "direct", None, &[&alice_id, &bob_id]).await;

    let message = send(&server, &alice_token, &conv, "Morning run at 7?").await;
    assert_eq!(message["senderId"], alice_id.as_str());
    assert_eq!(message["readBy"], json!([&alice_id]));

    let entry = directory_entry(&server, &alice_token, &conv).await;
    assert_eq!(entry["lastMessage"]["content"], "Morning run at 7?");
    assert_eq!(entry["lastMessage"]["senderId"], alice_id.as_str());
    assert_eq!(entry["lastMessage"]["sentAt"], message["createdAt"]);
    assert_eq!(entry["updatedAt"], message["createdAt"]);
}

#[tokio::test]
async fn send_increments_unread_for_others_only() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice", "pass1234").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob@test.com", "bob", "pass1234").await;
    let (carol_id, carol_token) = common::create_test_user(&pool, "carol@test.com", "carol", "pass1234").await;
    let conv = common::create_test_conversation(&pool, "group", Some("Club"), &[&alice_id, &bob_id, &carol_id]).await;

    send(&server, &alice_token, &conv, "one").await;
    send(&server, &alice_token, &conv, "two").await;

    assert_eq!(directory_entry(&server, &alice_token, &conv).await["unreadCount"], 0);
    assert_eq!(directory_entry(&server, &bob_token, &conv).await["unreadCount"], 2);

    let entry = directory_entry(&server, &carol_token, &conv).await;
    assert_eq!(entry["unreadCount"], 2);
    assert_eq!(entry["unreadCounts"][&bob_id], 2);
    assert_eq!(entry["unreadCounts"][&alice_id], 0);
}

#[tokio::test]
async fn mark_read_is_idempotent() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice", "pass1234").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob@test.com", "bob", "pass1234").await;
    let conv = common::create_test_conversation(&pool, "direct", None, &[&alice_id, &bob_id]).await;

    send(&server, &alice_token, &conv, "first").await;
    send(&server, &alice_token, &conv, "second").await;

    let (h, v) = auth_header(&bob_token);
    let res = server
        .post(&format!("/api/conversations/{}/read", conv))
        .add_header(h, v)
        .await;
    res.assert_status_ok();
    let body: Value = res.json();
    assert_eq!(body["conversationId"], conv.as_str());
    assert_eq!(body["unreadCount"], 0);
    assert_eq!(body["marked"], 2);

    let (h, v) = auth_header(&bob_token);
    let res = server
        .post(&format!("/api/conversations/{}/read", conv))
        .add_header(h, v)
        .await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["marked"], 0);

    assert_eq!(directory_entry(&server, &bob_token, &conv).await["unreadCount"], 0);

    let (h, v) = auth_header(&bob_token);
    let res = server
        .get(&format!("/api/conversations/{}/messages", conv))
        .add_header(h, v)
        .await;
    for message in res.json::<Value>()["items"].as_array().unwrap() {
        let read_by = message["readBy"].as_array().unwrap();
        assert_eq!(read_by.len(), 2);
        assert!(read_by.contains(&json!(&bob_id)));
    }
}

#[tokio::test]
async fn mark_read_requires_participation() {
    let (server, pool) = setup().await;
    let (alice_id, _) = common::create_test_user(&pool, "alice@test.com", "alice", "pass1234").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob@test.com", "bob", "pass1234").await;
    let (_, carol_token) = common::create_test_user(&pool, "carol@test.com", "carol", "pass1234").await;
    let conv = common::create_test_conversation(&pool, "direct", None, &[&alice_id, &bob_id]).await;

    let (h, v) = auth_header(&carol_token);
    server
        .post(&format!("/api/conversations/{}/read", conv))
        .add_header(h, v)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn send_rejections_write_nothing() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice", "pass1234").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob@test.com", "bob", "pass1234").await;
    let (_, carol_token) = common::create_test_user(&pool, "carol@test.com", "carol", "pass1234").await;
    let conv = common::create_test_conversation(&pool, "direct", None, &[&alice_id, &bob_id]).await;

    let (h, v) = auth_header(&alice_token);
    server
        .post(&format!("/api/conversations/{}/messages", conv))
        .add_header(h, v)
        .json(&json!({ "content": "   " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let (h, v) = auth_header(&alice_token);
    server
        .post(&format!("/api/conversations/{}/messages", conv))
        .add_header(h, v)
        .json(&json!({ "content": "x".repeat(4001) }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let (h, v) = auth_header(&carol_token);
    server
        .post(&format!("/api/conversations/{}/messages", conv))
        .add_header(h, v)
        .json(&json!({ "content": "let me in" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let (h, v) = auth_header(&alice_token);
    server
        .post("/api/conversations/missing/messages")
        .add_header(h, v)
        .json(&json!({ "content": "hello?" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    let unread: i64 = sqlx::query_scalar("SELECT SUM(unread_count) FROM conversation_participants")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(unread, 0);
}

#[tokio::test]
async fn history_pages_backwards_without_gaps() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice", "pass1234").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob@test.com", "bob", "pass1234").await;
    let conv = common::create_test_conversation(&pool, "direct", None, &[&alice_id, &bob_id]).await;

    for i in 0..7 {
        send(&server, &alice_token, &conv, &format!("msg {}", i)).await;
    }

    let mut seen: Vec<String> = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let mut url = format!("/api/conversations/{}/messages?limit=3", conv);
        if let Some(ref c) = cursor {
            url.push_str(&format!("&cursor={}", c));
        }
        let (h, v) = auth_header(&alice_token);
        let res = server.get(&url).add_header(h, v).await;
        res.assert_status_ok();
        let page: Value = res.json();

        let contents: Vec<String> = page["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap().to_string())
            .collect();
        // Each page is ascending; pages walk backwards
        let mut sorted = contents.clone();
        sorted.sort();
        assert_eq!(contents, sorted);
        seen.splice(0..0, contents);

        if !page["hasMore"].as_bool().unwrap() {
            break;
        }
        cursor = page["cursor"].as_str().map(|s| s.to_string());
    }

    let expected: Vec<String> = (0..7).map(|i| format!("msg {}", i)).collect();
    assert_eq!(seen, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sends_leave_snapshot_on_newest_message() {
    let (pool, path) = common::setup_file_db().await;

    let mut senders = Vec::new();
    for i in 0..8 {
        let (id, _) = common::create_test_user(&pool, &format!("crew{}@test.com", i), &format!("crew{}", i), "pass1234").await;
        senders.push(AuthUser {
            id,
            username: format!("crew{}", i),
            name: format!("crew{}", i),
            is_super_admin: false,
        });
    }
    let ids: Vec<&str> = senders.iter().map(|s| s.id.as_str()).collect();
    let conversation = common::create_test_conversation(&pool, "group", Some("Rowing crew"), &ids).await;

    for round in 0..10 {
        let handles: Vec<_> = senders
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, sender)| {
                let pool = pool.clone();
                let conversation = conversation.clone();
                tokio::spawn(async move {
                    stream::send_message(&pool, &sender, &conversation, &format!("r{}m{}", round, i)).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().expect("concurrent send failed");
        }

        let (snapshot_content, snapshot_at, updated_at): (String, String, String) = sqlx::query_as(
            "SELECT last_message_content, last_message_at, updated_at FROM conversations WHERE id = ?",
        )
        .bind(&conversation)
        .fetch_one(&pool)
        .await
        .unwrap();
        let (newest_content, newest_at): (String, String) = sqlx::query_as(
            "SELECT content, created_at FROM messages WHERE conversation_id = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(&conversation)
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(snapshot_at, newest_at, "round {}", round);
        assert_eq!(snapshot_content, newest_content, "round {}", round);
        assert_eq!(updated_at, newest_at, "round {}", round);
    }

    common::remove_file_db(pool, path).await;
}
