pub mod admin;
pub mod auth;
pub mod conversations;
pub mod events;
pub mod feed;
pub mod files;
pub mod users;

use crate::ws;
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

/// Multipart framing on top of the file itself.
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/sign-up/email", post(auth::sign_up))
        .route("/sign-in/email", post(auth::sign_in))
        .route("/sign-out", post(auth::sign_out))
        .route("/get-session", get(auth::get_session))
        .route("/verify-email/request", post(auth::request_verification))
        .route("/verify-email", post(auth::verify_email));

    let upload_limit = state.config.max_upload_bytes as usize + UPLOAD_OVERHEAD_BYTES;

    let api_routes = Router::new()
        // Conversations
        .route(
            "/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route("/conversations/{conversationId}", get(conversations::get_conversation))
        .route(
            "/conversations/{conversationId}/participants",
            post(conversations::add_participant),
        )
        .route(
            "/conversations/{conversationId}/messages",
            get(conversations::list_messages).post(conversations::send_message),
        )
        .route("/conversations/{conversationId}/read", post(conversations::mark_read))
        // Feed
        .route("/feed", get(feed::get_feed))
        .route("/posts", post(feed::create_post))
        .route("/posts/{postId}", get(feed::get_post))
        .route("/posts/{postId}/like", post(feed::like_post).delete(feed::unlike_post))
        .route(
            "/posts/{postId}/comments",
            get(feed::list_comments).post(feed::add_comment),
        )
        // Events
        .route("/events", get(events::list_events).post(events::create_event))
        .route("/events/{eventId}", get(events::get_event))
        .route("/events/{eventId}/ratings", post(events::rate_event))
        // Users
        .route("/users/me", get(users::get_me).patch(users::update_me))
        .route("/users/me/dashboard", get(users::dashboard))
        .route("/users/search", get(users::search_users))
        // Admin
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{userId}", patch(admin::update_user))
        // Files
        .route(
            "/upload",
            post(files::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files/{id}", get(files::serve_file));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .route("/gateway", get(ws::handler::ws_handler))
        .with_state(state)
}
