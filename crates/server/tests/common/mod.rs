#![allow(dead_code)]

pub mod ws_helpers;

use argon2::PasswordHasher;
use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;
use stride_server::{config::Config, db, routes, AppState};

/// Create an in-memory SQLite pool with schema applied.
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();

    db::apply_schema(&pool).await.unwrap();
    pool
}

/// File-backed pool with the production settings (WAL, several connections),
/// for tests that need real concurrent writers. Returns the pool and its path.
pub async fn setup_file_db() -> (SqlitePool, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("stride-test-{}.db", uuid::Uuid::new_v4()));
    let pool = db::init_pool(path.to_str().unwrap())
        .await
        .expect("Failed to create file-backed SQLite pool");
    (pool, path)
}

pub async fn remove_file_db(pool: SqlitePool, path: std::path::PathBuf) {
    pool.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

pub fn test_config() -> Config {
    let upload_dir = std::env::temp_dir().join(format!("stride-test-uploads-{}", uuid::Uuid::new_v4()));
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        database_path: ":memory:".into(),
        upload_dir: upload_dir.to_string_lossy().into_owned(),
        max_upload_bytes: 1_048_576,
        public_base_url: "http://localhost:3001".into(),
        session_ttl_days: 30,
    }
}

/// Build a test Axum app with the given pool.
pub fn create_test_app(pool: SqlitePool) -> Router {
    let state = Arc::new(AppState::new(pool, test_config()));
    routes::build_router(state)
}

pub fn auth_header(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        format!("Bearer {}", token).parse().unwrap(),
    )
}

/// Create a test user directly in the database. Returns (user_id, session_token).
pub async fn create_test_user(
    pool: &SqlitePool,
    email: &str,
    username: &str,
    password: &str,
) -> (String, String) {
    let user_id = uuid::Uuid::new_v4().to_string();
    let now = db::timestamp();

    sqlx::query(
        r#"INSERT INTO "user" (id, name, username, email, emailVerified, createdAt, updatedAt)
           VALUES (?, ?, ?, ?, 0, ?, ?)"#,
    )
    .bind(&user_id)
    .bind(username)
    .bind(username)
    .bind(email)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    let salt = argon2::password_hash::SaltString::generate(&mut rand::rngs::OsRng);
    let password_hash = argon2::Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string();

    sqlx::query(
        r#"INSERT INTO "account" (id, userId, accountId, providerId, password, createdAt, updatedAt)
           VALUES (?, ?, ?, 'credential', ?, ?, ?)"#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&user_id)
    .bind(&user_id)
    .bind(&password_hash)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    let session_token = uuid::Uuid::new_v4().to_string();
    let expires_at = (chrono::Utc::now() + chrono::Duration::days(30))
        .to_rfc3339_opts(chrono::SecondsFormat::Micros, true);

    sqlx::query(
        r#"INSERT INTO "session" (id, userId, token, expiresAt, createdAt, updatedAt)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&user_id)
    .bind(&session_token)
    .bind(&expires_at)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    (user_id, session_token)
}

pub async fn make_super_admin(pool: &SqlitePool, user_id: &str) {
    sqlx::query(r#"UPDATE "user" SET is_super_admin = 1 WHERE id = ?"#)
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
}

/// Create a conversation with the given participants (the first one is the creator).
pub async fn create_test_conversation(
    pool: &SqlitePool,
    kind: &str,
    name: Option<&str>,
    participants: &[&str],
) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    let now = db::timestamp();
    let direct_key = (kind == "direct").then(|| {
        let mut pair = [participants[0], participants[1]];
        pair.sort();
        format!("{}:{}", pair[0], pair[1])
    });

    sqlx::query(
        "INSERT INTO conversations (id, kind, name, direct_key, created_by, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(kind)
    .bind(name)
    .bind(&direct_key)
    .bind(participants[0])
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    for user_id in participants {
        sqlx::query(
            "INSERT INTO conversation_participants (conversation_id, user_id, unread_count, joined_at) VALUES (?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();
    }

    id
}

/// Create a test attachment record (no actual file on disk).
pub async fn create_test_attachment(pool: &SqlitePool, uploader_id: &str, filename: &str, content_type: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO attachments (id, uploader_id, filename, content_type, size, created_at) VALUES (?, ?, ?, ?, 1024, ?)")
        .bind(&id).bind(uploader_id).bind(filename).bind(content_type).bind(db::timestamp())
        .execute(pool).await.unwrap();
    id
}

/// Create an event directly. `location` is (latitude, longitude).
pub async fn create_test_event(
    pool: &SqlitePool,
    creator_id: &str,
    title: &str,
    category: &str,
    starts_at: &str,
    location: Option<(f64, f64)>,
) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO events (id, title, description, category, starts_at, latitude, longitude, rating_avg, rating_count, created_by, created_at)
         VALUES (?, ?, NULL, ?, ?, ?, ?, 0, 0, ?, ?)",
    )
    .bind(&id)
    .bind(title)
    .bind(category)
    .bind(starts_at)
    .bind(location.map(|l| l.0))
    .bind(location.map(|l| l.1))
    .bind(creator_id)
    .bind(db::timestamp())
    .execute(pool)
    .await
    .unwrap();
    id
}
