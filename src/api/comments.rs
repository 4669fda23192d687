use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::JsonBody;
use crate::app_state::AppState;
use crate::entities::EntComment;
use crate::error::AppError;
use crate::infrastructure::middleware::Viewer;
use crate::infrastructure::query::{Page, PageRequest};
use crate::response::ApiResponse;
use crate::services::CommentService;

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/{video_id}",
            get(get_video_comments_handler).post(add_comment_handler),
        )
        .route(
            "/c/{comment_id}",
            patch(update_comment_handler).delete(delete_comment_handler),
        )
}

pub async fn get_video_comments_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(video_id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<ApiResponse<Page>, AppError> {
    let page = PageRequest::from_query(params.page.as_deref(), params.limit.as_deref())?;
    let comments = CommentService::from_state(&state)
        .get_video_comments(viewer.user_id(), &video_id, page)
        .await?;
    Ok(ApiResponse::ok(comments, "Comments fetched successfully"))
}

pub async fn add_comment_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(video_id): Path<String>,
    JsonBody(req): JsonBody<CommentRequest>,
) -> Result<ApiResponse<EntComment>, AppError> {
    let comment = CommentService::from_state(&state)
        .add_comment(viewer.user_id(), &video_id, req.content.as_deref())
        .await?;
    Ok(ApiResponse::created(comment, "Comment added successfully"))
}

pub async fn update_comment_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(comment_id): Path<String>,
    JsonBody(req): JsonBody<CommentRequest>,
) -> Result<ApiResponse<EntComment>, AppError> {
    let comment = CommentService::from_state(&state)
        .update_comment(viewer.user_id(), &comment_id, req.content.as_deref())
        .await?;
    Ok(ApiResponse::ok(comment, "Comment updated successfully"))
}

pub async fn delete_comment_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(comment_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let id = CommentService::from_state(&state)
        .delete_comment(viewer.user_id(), &comment_id)
        .await?;
    Ok(ApiResponse::ok(json!({ "commentId": id }), "Comment deleted successfully"))
}
