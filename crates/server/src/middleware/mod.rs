pub mod auth;

pub use auth::{resolve_session, session_token_from_headers, SESSION_COOKIE};
