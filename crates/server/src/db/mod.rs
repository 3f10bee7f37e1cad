use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use std::sync::atomic::{AtomicI64, Ordering};

static LAST_TIMESTAMP_MICROS: AtomicI64 = AtomicI64::new(0);

/// Server-assigned timestamp in fixed-width RFC 3339 (microseconds, `Z`).
///
/// Strictly increasing within the process, so lexical order matches issue
/// order and timestamp cursors never skip rows sharing an instant.
pub fn timestamp() -> String {
    let now = chrono::Utc::now().timestamp_micros();
    let mut last = LAST_TIMESTAMP_MICROS.load(Ordering::Relaxed);
    let micros = loop {
        let next = now.max(last + 1);
        match LAST_TIMESTAMP_MICROS.compare_exchange_weak(
            last,
            next,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break next,
            Err(actual) => last = actual,
        }
    };
    chrono::DateTime::from_timestamp_micros(micros)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Apply `schema.sql` statement by statement.
pub async fn apply_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let schema = include_str!("schema.sql");

    // SQLx doesn't support multi-statement queries directly
    for statement in schema.split(';') {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

pub async fn init_pool(database_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(database_path).parent() {
        std::fs::create_dir_all(parent).ok();
    }

    // Per-connection pragmas go on the connect options so every pooled
    // connection gets them.
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", database_path))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    apply_schema(&pool).await?;

    tracing::info!("Database initialized at {}", database_path);
    Ok(pool)
}

/// Open a transaction that holds the write lock from its first statement.
///
/// A deferred transaction that reads before writing cannot wait out a
/// concurrent writer under WAL; it fails with SQLITE_BUSY_SNAPSHOT instead.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

/// SQLite reports write conflicts as SQLITE_BUSY (5) or SQLITE_LOCKED (6),
/// possibly refined into an extended code (e.g. 517, BUSY_SNAPSHOT).
pub fn is_write_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| matches!(code & 0xff, 5 | 6)),
        _ => false,
    }
}
