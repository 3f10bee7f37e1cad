use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub starts_at: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating_avg: f64,
    pub rating_count: i64,
    pub created_by: String,
    pub created_at: String,
    /// Great-circle distance from the query origin, when one was given.
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub starts_at: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse {
    pub event_id: String,
    pub score: i64,
    pub rating_avg: f64,
    pub rating_count: i64,
}
