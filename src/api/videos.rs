use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, patch},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::MultipartForm;
use crate::app_state::AppState;
use crate::entities::EntVideo;
use crate::error::AppError;
use crate::feeds::VideoFeedQuery;
use crate::infrastructure::middleware::Viewer;
use crate::infrastructure::query::{Page, PageRequest};
use crate::response::ApiResponse;
use crate::services::{PublishVideoInput, UpdateVideoInput, VideoService};

/// Query string of the video listing. Everything arrives as text and is
/// validated when the feed is built.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub query: Option<String>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
    pub user_id: Option<String>,
}

impl VideoListParams {
    pub fn into_feed_query(self) -> Result<VideoFeedQuery, AppError> {
        Ok(VideoFeedQuery {
            page: PageRequest::from_query(self.page.as_deref(), self.limit.as_deref())?,
            query: self.query,
            owner: self.user_id,
            sort_by: self.sort_by,
            sort_type: self.sort_type,
        })
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_all_videos_handler).post(publish_video_handler))
        .route(
            "/{video_id}",
            get(get_video_handler)
                .patch(update_video_handler)
                .delete(delete_video_handler),
        )
        .route("/toggle/publish/{video_id}", patch(toggle_publish_handler))
}

pub async fn get_all_videos_handler(
    State(state): State<AppState>,
    Query(params): Query<VideoListParams>,
) -> Result<ApiResponse<Page>, AppError> {
    let query = params.into_feed_query()?;
    let page = VideoService::from_state(&state).get_all_videos(&query).await?;
    Ok(ApiResponse::ok(page, "Videos fetched successfully"))
}

pub async fn publish_video_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    multipart: Multipart,
) -> Result<ApiResponse<EntVideo>, AppError> {
    let form = MultipartForm::read(multipart, &state.config.server.upload_temp_dir).await?;

    let video = VideoService::from_state(&state)
        .publish_video(
            viewer.user_id(),
            PublishVideoInput {
                title: form.text("title"),
                description: form.text("description"),
                video_file: form.file("videoFile"),
                thumbnail: form.file("thumbnail"),
            },
        )
        .await?;

    Ok(ApiResponse::ok(video, "Video uploaded successfully"))
}

pub async fn get_video_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<EntVideo>, AppError> {
    let video = VideoService::from_state(&state)
        .get_video_by_id(viewer.user_id(), &video_id)
        .await?;
    Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

pub async fn update_video_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(video_id): Path<String>,
    multipart: Multipart,
) -> Result<ApiResponse<EntVideo>, AppError> {
    let form = MultipartForm::read(multipart, &state.config.server.upload_temp_dir).await?;

    let video = VideoService::from_state(&state)
        .update_video(
            viewer.user_id(),
            &video_id,
            UpdateVideoInput {
                title: form.text("title"),
                description: form.text("description"),
                thumbnail: form.file("thumbnail"),
            },
        )
        .await?;

    Ok(ApiResponse::ok(video, "Video updated successfully"))
}

pub async fn delete_video_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    VideoService::from_state(&state)
        .delete_video(viewer.user_id(), &video_id)
        .await?;
    Ok(ApiResponse::ok(json!({}), "Video deleted successfully"))
}

pub async fn toggle_publish_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let status = VideoService::from_state(&state)
        .toggle_publish_status(viewer.user_id(), &video_id)
        .await?;
    Ok(ApiResponse::ok(status, "Video publish status toggled successfully"))
}
