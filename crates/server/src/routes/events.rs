use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use stride_shared::constants::{FEED_PAGE_SIZE, MAX_FEED_PAGE_SIZE};

use crate::error::{ApiError, ApiResult};
use crate::events::{self, ratings, Near};
use crate::models::{AuthUser, CreateEventRequest, Event, PaginatedResponse, RatingRequest, RatingResponse};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub category: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<i64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
}

impl EventsQuery {
    /// All three geo parameters or none of them.
    fn near(&self) -> ApiResult<Option<Near>> {
        match (self.lat, self.lng, self.radius_km) {
            (None, None, None) => Ok(None),
            (Some(latitude), Some(longitude), Some(radius_km)) => {
                stride_shared::validation::validate_coordinates(latitude, longitude)
                    .map_err(ApiError::Validation)?;
                stride_shared::validation::validate_radius_km(radius_km)
                    .map_err(ApiError::Validation)?;
                Ok(Some(Near {
                    latitude,
                    longitude,
                    radius_km,
                }))
            }
            _ => Err(ApiError::Validation(
                "lat, lng and radiusKm must be given together".into(),
            )),
        }
    }
}

/// GET /api/events
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Json<PaginatedResponse<Event>>> {
    let near = query.near()?;
    let limit = query.limit.unwrap_or(FEED_PAGE_SIZE).clamp(1, MAX_FEED_PAGE_SIZE);
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let page = events::page(&state.db, category, query.cursor.as_deref(), near, limit).await?;
    Ok(Json(page))
}

/// POST /api/events
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let event = events::create_event(&state.db, &user, body).await?;
    tracing::info!("User {} created event {}", user.id, event.id);
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /api/events/{eventId}
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(event_id): Path<String>,
) -> ApiResult<Json<Event>> {
    Ok(Json(events::get_event(&state.db, &event_id).await?))
}

/// POST /api/events/{eventId}/ratings
pub async fn rate_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(event_id): Path<String>,
    Json(body): Json<RatingRequest>,
) -> ApiResult<Json<RatingResponse>> {
    Ok(Json(
        ratings::submit_rating(&state.db, &user.id, &event_id, body.score).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::EventsQuery;

    fn query(lat: Option<f64>, lng: Option<f64>, radius_km: Option<f64>) -> EventsQuery {
        EventsQuery {
            category: None,
            cursor: None,
            limit: None,
            lat,
            lng,
            radius_km,
        }
    }

    #[test]
    fn geo_parameters_are_all_or_nothing() {
        assert!(query(None, None, None).near().unwrap().is_none());
        assert!(query(Some(52.5), Some(13.4), Some(5.0)).near().unwrap().is_some());
        assert!(query(Some(52.5), None, Some(5.0)).near().is_err());
        assert!(query(Some(52.5), Some(13.4), None).near().is_err());
    }

    #[test]
    fn geo_parameters_are_validated() {
        assert!(query(Some(91.0), Some(13.4), Some(5.0)).near().is_err());
        assert!(query(Some(52.5), Some(13.4), Some(-1.0)).near().is_err());
    }
}
