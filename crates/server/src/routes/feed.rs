use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use stride_shared::constants::{FEED_PAGE_SIZE, MAX_FEED_PAGE_SIZE};

use crate::error::ApiResult;
use crate::feed::{self, engagement};
use crate::models::{
    AuthUser, Comment, CreateCommentRequest, CreatePostRequest, LikeResponse, PaginatedResponse, Post,
};
use crate::routes::conversations::PageQuery;
use crate::ws::events::ServerEvent;
use crate::ws::gateway::Topic;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub category: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/feed
pub async fn get_feed(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Json<PaginatedResponse<Post>>> {
    let limit = query.limit.unwrap_or(FEED_PAGE_SIZE).clamp(1, MAX_FEED_PAGE_SIZE);
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let page = feed::page(
        &state.db,
        &state.config,
        category,
        query.cursor.as_deref(),
        limit,
    )
    .await?;
    Ok(Json(page))
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let post = feed::create_post(&state.db, &state.config, &user, body).await?;

    let event = ServerEvent::PostCreated { post: post.clone() };
    state.gateway.broadcast_topic(&Topic::Feed(None), &event, None).await;
    state
        .gateway
        .broadcast_topic(&Topic::Feed(Some(post.category.clone())), &event, None)
        .await;

    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/posts/{postId}
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(post_id): Path<String>,
) -> ApiResult<Json<Post>> {
    Ok(Json(feed::get_post(&state.db, &state.config, &post_id).await?))
}

/// POST /api/posts/{postId}/like
pub async fn like_post(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(post_id): Path<String>,
) -> ApiResult<Json<LikeResponse>> {
    Ok(Json(engagement::like(&state.db, &user.id, &post_id).await?))
}

/// DELETE /api/posts/{postId}/like
pub async fn unlike_post(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(post_id): Path<String>,
) -> ApiResult<Json<LikeResponse>> {
    Ok(Json(engagement::unlike(&state.db, &user.id, &post_id).await?))
}

/// GET /api/posts/{postId}/comments
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(post_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<PaginatedResponse<Comment>>> {
    let limit = query.clamped_limit(FEED_PAGE_SIZE, MAX_FEED_PAGE_SIZE);
    let page = engagement::list_comments(&state.db, &post_id, query.cursor.as_deref(), limit).await?;
    Ok(Json(page))
}

/// POST /api/posts/{postId}/comments
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(post_id): Path<String>,
    Json(body): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let comment = engagement::add_comment(&state.db, &user, &post_id, &body.content).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
