use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use stride_shared::constants::{MAX_MESSAGE_PAGE_SIZE, MESSAGE_PAGE_SIZE};

use crate::chat::{directory, live, stream, unread};
use crate::error::ApiResult;
use crate::models::{
    AddParticipantRequest, AuthUser, ConversationView, CreateConversationRequest, MarkReadResponse,
    Message, PaginatedResponse, SendMessageRequest,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn clamped_limit(&self, default: i64, max: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, max)
    }
}

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<ConversationView>>> {
    Ok(Json(directory::list_for_user(&state.db, &user.id).await?))
}

/// POST /api/conversations
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateConversationRequest>,
) -> ApiResult<(StatusCode, Json<ConversationView>)> {
    let (view, created) = directory::create(&state.db, &user, body).await?;
    if !created {
        return Ok((StatusCode::OK, Json(view)));
    }

    tracing::info!("User {} created {:?} conversation {}", user.id, view.kind, view.id);
    live::publish_directories(&state, &view.id).await;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/conversations/{conversationId}
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
) -> ApiResult<Json<ConversationView>> {
    Ok(Json(
        directory::get_for_user(&state.db, &conversation_id, &user.id).await?,
    ))
}

/// POST /api/conversations/{conversationId}/participants
pub async fn add_participant(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
    Json(body): Json<AddParticipantRequest>,
) -> ApiResult<Json<ConversationView>> {
    let view = directory::add_participant(&state.db, &user, &conversation_id, &body.user_id).await?;
    live::publish_directories(&state, &conversation_id).await;
    Ok(Json(view))
}

/// GET /api/conversations/{conversationId}/messages
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<PaginatedResponse<Message>>> {
    directory::ensure_participant(&state.db, &conversation_id, &user.id).await?;

    let limit = query.clamped_limit(MESSAGE_PAGE_SIZE, MAX_MESSAGE_PAGE_SIZE);
    let page = stream::page(&state.db, &conversation_id, query.cursor.as_deref(), limit).await?;
    Ok(Json(page))
}

/// POST /api/conversations/{conversationId}/messages
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let message = stream::send_message(&state.db, &user, &conversation_id, &body.content).await?;
    live::publish_conversation_changed(&state, &conversation_id).await;
    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /api/conversations/{conversationId}/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
) -> ApiResult<Json<MarkReadResponse>> {
    let response = unread::mark_read(&state.db, &user.id, &conversation_id).await?;
    if response.marked > 0 {
        live::publish_window(&state, &conversation_id).await;
    }
    live::publish_directory(&state, &user.id).await;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::PageQuery;

    #[test]
    fn limit_is_clamped() {
        let q = |limit| PageQuery { cursor: None, limit };
        assert_eq!(q(None).clamped_limit(50, 100), 50);
        assert_eq!(q(Some(0)).clamped_limit(50, 100), 1);
        assert_eq!(q(Some(-5)).clamped_limit(50, 100), 1);
        assert_eq!(q(Some(500)).clamped_limit(50, 100), 100);
        assert_eq!(q(Some(20)).clamped_limit(50, 100), 20);
    }
}
