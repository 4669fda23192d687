use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::error::AppError;
use crate::infrastructure::middleware::Viewer;
use crate::response::ApiResponse;
use crate::services::LikeService;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/toggle/v/{video_id}", post(toggle_video_like_handler))
        .route("/toggle/c/{comment_id}", post(toggle_comment_like_handler))
        .route("/toggle/t/{tweet_id}", post(toggle_tweet_like_handler))
        .route("/videos", get(get_liked_videos_handler))
}

fn like_status(is_liked: bool) -> ApiResponse<Value> {
    let message = if is_liked { "Liked successfully" } else { "Like removed successfully" };
    ApiResponse::ok(json!({ "isLiked": is_liked }), message)
}

pub async fn toggle_video_like_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let is_liked = LikeService::from_state(&state)
        .toggle_video_like(viewer.user_id(), &video_id)
        .await?;
    Ok(like_status(is_liked))
}

pub async fn toggle_comment_like_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(comment_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let is_liked = LikeService::from_state(&state)
        .toggle_comment_like(viewer.user_id(), &comment_id)
        .await?;
    Ok(like_status(is_liked))
}

pub async fn toggle_tweet_like_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(tweet_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let is_liked = LikeService::from_state(&state)
        .toggle_tweet_like(viewer.user_id(), &tweet_id)
        .await?;
    Ok(like_status(is_liked))
}

pub async fn get_liked_videos_handler(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<ApiResponse<Vec<Value>>, AppError> {
    let videos = LikeService::from_state(&state)
        .get_liked_videos(viewer.user_id())
        .await?;
    Ok(ApiResponse::ok(videos, "Liked videos fetched successfully"))
}
