use sqlx::SqlitePool;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::RatingResponse;

const MAX_ATTEMPTS: u32 = 3;

/// Fold one score into a running mean and count.
///
/// A first rating adds a contribution; a re-rating swaps the old score for
/// the new one and keeps the count.
pub fn fold_rating(avg: f64, count: i64, previous: Option<i64>, score: i64) -> (f64, i64) {
    match previous {
        Some(old) if count > 0 => (avg + (score - old) as f64 / count as f64, count),
        // Aggregate lost track of an existing rating; restart from it.
        Some(_) => (score as f64, 1),
        None => (
            (avg * count as f64 + score as f64) / (count + 1) as f64,
            count + 1,
        ),
    }
}

/// Rate an event 1..=5, keeping the event's mean and count in step with the
/// individual rating rows. The whole read-modify-write runs in one
/// transaction and is retried when SQLite reports a write conflict.
pub async fn submit_rating(
    db: &SqlitePool,
    user_id: &str,
    event_id: &str,
    raw_score: f64,
) -> ApiResult<RatingResponse> {
    let score = stride_shared::validation::validate_rating(raw_score).map_err(ApiError::Validation)?;

    let mut attempt = 1;
    loop {
        match try_submit(db, user_id, event_id, score).await {
            Err(ApiError::Database(e)) if db::is_write_conflict(&e) && attempt < MAX_ATTEMPTS => {
                tracing::warn!(
                    "Rating of {} by {} conflicted (attempt {}), retrying",
                    event_id,
                    user_id,
                    attempt
                );
                attempt += 1;
            }
            other => return other,
        }
    }
}

async fn try_submit(db: &SqlitePool, user_id: &str, event_id: &str, score: i64) -> ApiResult<RatingResponse> {
    let mut tx = db::begin_write(db).await?;

    let (avg, count) = sqlx::query_as::<_, (f64, i64)>(
        "SELECT rating_avg, rating_count FROM events WHERE id = ?",
    )
    .bind(event_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;

    let previous = sqlx::query_scalar::<_, i64>(
        "SELECT score FROM event_ratings WHERE user_id = ? AND event_id = ?",
    )
    .bind(user_id)
    .bind(event_id)
    .fetch_optional(&mut *tx)
    .await?;

    let (new_avg, new_count) = fold_rating(avg, count, previous, score);
    let now = db::timestamp();

    sqlx::query(
        r#"INSERT INTO event_ratings (user_id, event_id, score, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?)
           ON CONFLICT(user_id, event_id) DO UPDATE SET score = excluded.score, updated_at = excluded.updated_at"#,
    )
    .bind(user_id)
    .bind(event_id)
    .bind(score)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE events SET rating_avg = ?, rating_count = ? WHERE id = ?")
        .bind(new_avg)
        .bind(new_count)
        .bind(event_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(RatingResponse {
        event_id: event_id.to_string(),
        score,
        rating_avg: new_avg,
        rating_count: new_count,
    })
}

pub async fn count_by_user(db: &SqlitePool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM event_ratings WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_of_first_ratings_does_not_matter() {
        let (a, n) = fold_rating(0.0, 0, None, 3);
        let (a, n) = fold_rating(a, n, None, 5);
        let (b, m) = fold_rating(0.0, 0, None, 5);
        let (b, m) = fold_rating(b, m, None, 3);
        assert_eq!((a, n), (4.0, 2));
        assert_eq!((b, m), (4.0, 2));
    }

    #[test]
    fn re_rating_keeps_count() {
        let (avg, count) = fold_rating(4.0, 2, Some(3), 4);
        assert_eq!((avg, count), (4.5, 2));
    }

    #[test]
    fn re_rating_against_empty_aggregate_restarts() {
        assert_eq!(fold_rating(0.0, 0, Some(2), 4), (4.0, 1));
    }
}
