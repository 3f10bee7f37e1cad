mod conversation;
mod event;
mod message;
mod post;
mod user;

pub use conversation::*;
pub use event::*;
pub use message::*;
pub use post::*;
pub use user::*;

use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub cursor: Option<String>,
    pub has_more: bool,
}

/// Authenticated caller, resolved once per request or connection.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub name: String,
    pub is_super_admin: bool,
}
