use axum::{extract::State, routing::get, Router};
use serde_json::Value;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::infrastructure::middleware::Viewer;
use crate::response::ApiResponse;
use crate::services::{ChannelStats, DashboardService};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(get_channel_stats_handler))
        .route("/videos", get(get_channel_videos_handler))
}

pub async fn get_channel_stats_handler(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<ApiResponse<ChannelStats>, AppError> {
    let stats = DashboardService::from_state(&state)
        .get_channel_stats(viewer.user_id())
        .await?;
    Ok(ApiResponse::ok(stats, "Channel stats fetched successfully"))
}

pub async fn get_channel_videos_handler(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<ApiResponse<Vec<Value>>, AppError> {
    let videos = DashboardService::from_state(&state)
        .get_channel_videos(viewer.user_id())
        .await?;
    Ok(ApiResponse::ok(videos, "Channel videos fetched successfully"))
}
