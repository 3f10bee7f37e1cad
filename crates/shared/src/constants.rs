pub const APP_NAME: &str = "Stride";

// Limits
pub const MAX_MESSAGE_LENGTH: usize = 4000;
pub const MAX_POST_LENGTH: usize = 5000;
pub const MAX_COMMENT_LENGTH: usize = 1000;
pub const MAX_CONVERSATION_NAME_LENGTH: usize = 100;
pub const MAX_EVENT_TITLE_LENGTH: usize = 140;
pub const MAX_CATEGORY_LENGTH: usize = 40;
pub const MAX_USERNAME_LENGTH: usize = 32;
pub const MIN_USERNAME_LENGTH: usize = 2;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_POST_MEDIA: usize = 10;

// Ratings
pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

// Pagination
pub const MESSAGE_PAGE_SIZE: i64 = 50;
pub const MAX_MESSAGE_PAGE_SIZE: i64 = 100;
pub const FEED_PAGE_SIZE: i64 = 10;
pub const MAX_FEED_PAGE_SIZE: i64 = 50;

// Geo
pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const MAX_RADIUS_KM: f64 = 20_000.0;

// WebSocket
pub const WS_HEARTBEAT_INTERVAL_MS: u64 = 30_000;
