//! Fitness events: listing with optional radius search, and ratings.

pub mod ratings;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::geo::{haversine_km, BoundingBox};
use crate::models::{AuthUser, CreateEventRequest, Event, PaginatedResponse};

/// Events sort by start time, newest first. Start times are user supplied and
/// may collide, so the cursor carries the id as a tie-breaker:
/// `<starts_at>|<id>`.
pub fn encode_cursor(event: &Event) -> String {
    format!("{}|{}", event.starts_at, event.id)
}

pub fn decode_cursor(cursor: &str) -> ApiResult<(String, String)> {
    cursor
        .split_once('|')
        .map(|(starts_at, id)| (starts_at.to_string(), id.to_string()))
        .ok_or_else(|| ApiError::Validation("Invalid cursor".into()))
}

/// Normalise an RFC 3339 instant to the fixed-width UTC form used for ordering.
pub fn normalize_instant(value: &str) -> ApiResult<String> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|t| {
            t.with_timezone(&chrono::Utc)
                .to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
        })
        .map_err(|_| ApiError::Validation("startsAt must be an RFC 3339 timestamp".into()))
}

#[derive(Debug, Clone, Copy)]
pub struct Near {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

pub async fn create_event(db: &SqlitePool, creator: &AuthUser, body: CreateEventRequest) -> ApiResult<Event> {
    stride_shared::validation::validate_event_title(&body.title).map_err(ApiError::Validation)?;
    stride_shared::validation::validate_category(&body.category).map_err(ApiError::Validation)?;
    let starts_at = normalize_instant(&body.starts_at)?;
    match (body.latitude, body.longitude) {
        (Some(lat), Some(lng)) => {
            stride_shared::validation::validate_coordinates(lat, lng).map_err(ApiError::Validation)?
        }
        (None, None) => {}
        _ => {
            return Err(ApiError::Validation(
                "latitude and longitude must be given together".into(),
            ))
        }
    }

    let event = Event {
        id: uuid::Uuid::new_v4().to_string(),
        title: body.title.trim().to_string(),
        description: body.description,
        category: body.category,
        starts_at,
        latitude: body.latitude,
        longitude: body.longitude,
        rating_avg: 0.0,
        rating_count: 0,
        created_by: creator.id.clone(),
        created_at: db::timestamp(),
        distance_km: None,
    };

    sqlx::query(
        r#"INSERT INTO events (id, title, description, category, starts_at, latitude, longitude, rating_avg, rating_count, created_by, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)"#,
    )
    .bind(&event.id)
    .bind(&event.title)
    .bind(&event.description)
    .bind(&event.category)
    .bind(&event.starts_at)
    .bind(event.latitude)
    .bind(event.longitude)
    .bind(&event.created_by)
    .bind(&event.created_at)
    .execute(db)
    .await?;

    Ok(event)
}

pub async fn get_event(db: &SqlitePool, event_id: &str) -> ApiResult<Event> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = ?")
        .bind(event_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))
}

async fn fetch_candidates(
    db: &SqlitePool,
    category: Option<&str>,
    after: Option<&(String, String)>,
    bbox: Option<&BoundingBox>,
    batch: i64,
) -> Result<Vec<Event>, sqlx::Error> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM events WHERE 1 = 1");
    if let Some(c) = category {
        qb.push(" AND category = ").push_bind(c);
    }
    if let Some((starts_at, id)) = after {
        qb.push(" AND (starts_at < ")
            .push_bind(starts_at.as_str())
            .push(" OR (starts_at = ")
            .push_bind(starts_at.as_str())
            .push(" AND id < ")
            .push_bind(id.as_str())
            .push("))");
    }
    if let Some(b) = bbox {
        qb.push(" AND latitude BETWEEN ")
            .push_bind(b.min_lat)
            .push(" AND ")
            .push_bind(b.max_lat)
            .push(" AND longitude BETWEEN ")
            .push_bind(b.min_lng)
            .push(" AND ")
            .push_bind(b.max_lng);
    }
    qb.push(" ORDER BY starts_at DESC, id DESC LIMIT ").push_bind(batch);
    qb.build_query_as::<Event>().fetch_all(db).await
}

/// One page of events, optionally within `near.radius_km` of a point.
///
/// The bounding box narrows candidates in SQL; the exact distance check runs
/// here. Candidates are scanned in batches until the page is full or the
/// range is exhausted, so filtering never produces a short page while more
/// matching events exist.
pub async fn page(
    db: &SqlitePool,
    category: Option<&str>,
    cursor: Option<&str>,
    near: Option<Near>,
    limit: i64,
) -> ApiResult<PaginatedResponse<Event>> {
    if let Some(c) = category {
        stride_shared::validation::validate_category(c).map_err(ApiError::Validation)?;
    }
    if let Some(n) = near {
        stride_shared::validation::validate_coordinates(n.latitude, n.longitude)
            .map_err(ApiError::Validation)?;
        stride_shared::validation::validate_radius_km(n.radius_km).map_err(ApiError::Validation)?;
    }

    let bbox = near.map(|n| BoundingBox::around(n.latitude, n.longitude, n.radius_km));
    let mut scan_after = cursor.map(decode_cursor).transpose()?;
    let batch = limit + 1;
    let mut matched: Vec<Event> = Vec::new();

    loop {
        let candidates = fetch_candidates(db, category, scan_after.as_ref(), bbox.as_ref(), batch).await?;
        let exhausted = (candidates.len() as i64) < batch;

        for mut event in candidates {
            scan_after = Some((event.starts_at.clone(), event.id.clone()));
            if let Some(n) = near {
                let (Some(lat), Some(lng)) = (event.latitude, event.longitude) else {
                    continue;
                };
                let distance = haversine_km(n.latitude, n.longitude, lat, lng);
                if distance > n.radius_km {
                    continue;
                }
                event.distance_km = Some(distance);
            }
            matched.push(event);
            if matched.len() as i64 > limit {
                break;
            }
        }

        if exhausted || matched.len() as i64 > limit {
            break;
        }
    }

    let has_more = matched.len() as i64 > limit;
    if has_more {
        matched.pop();
    }
    let cursor = matched.last().map(encode_cursor);

    Ok(PaginatedResponse {
        items: matched,
        cursor,
        has_more,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips_through_separator() {
        let (starts_at, id) = decode_cursor("2025-06-01T09:00:00.000000Z|abc").unwrap();
        assert_eq!(starts_at, "2025-06-01T09:00:00.000000Z");
        assert_eq!(id, "abc");
        assert!(decode_cursor("no-separator").is_err());
    }

    #[test]
    fn instants_normalise_to_utc() {
        assert_eq!(
            normalize_instant("2025-06-01T11:00:00+02:00").unwrap(),
            "2025-06-01T09:00:00.000000Z"
        );
        assert!(normalize_instant("tomorrow").is_err());
    }
}
