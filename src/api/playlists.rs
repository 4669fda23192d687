use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::JsonBody;
use crate::app_state::AppState;
use crate::entities::EntPlaylist;
use crate::error::AppError;
use crate::infrastructure::middleware::Viewer;
use crate::response::ApiResponse;
use crate::services::PlaylistService;

#[derive(Debug, Deserialize)]
pub struct PlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_playlist_handler))
        .route(
            "/{playlist_id}",
            get(get_playlist_handler)
                .patch(update_playlist_handler)
                .delete(delete_playlist_handler),
        )
        .route("/add/{video_id}/{playlist_id}", patch(add_video_handler))
        .route("/remove/{video_id}/{playlist_id}", patch(remove_video_handler))
        .route("/user/{user_id}", get(get_user_playlists_handler))
}

pub async fn create_playlist_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    JsonBody(req): JsonBody<PlaylistRequest>,
) -> Result<ApiResponse<EntPlaylist>, AppError> {
    let playlist = PlaylistService::from_state(&state)
        .create(viewer.user_id(), req.name.as_deref(), req.description.as_deref())
        .await?;
    Ok(ApiResponse::ok(playlist, "Playlist created successfully"))
}

pub async fn get_playlist_handler(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let playlist = PlaylistService::from_state(&state)
        .get_playlist_by_id(&playlist_id)
        .await?;
    Ok(ApiResponse::ok(playlist, "Playlist fetched successfully"))
}

pub async fn update_playlist_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(playlist_id): Path<String>,
    JsonBody(req): JsonBody<PlaylistRequest>,
) -> Result<ApiResponse<EntPlaylist>, AppError> {
    let playlist = PlaylistService::from_state(&state)
        .update(
            viewer.user_id(),
            &playlist_id,
            req.name.as_deref(),
            req.description.as_deref(),
        )
        .await?;
    Ok(ApiResponse::ok(playlist, "Playlist updated successfully"))
}

pub async fn delete_playlist_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(playlist_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    PlaylistService::from_state(&state)
        .delete(viewer.user_id(), &playlist_id)
        .await?;
    Ok(ApiResponse::ok(json!({}), "Playlist deleted successfully"))
}

pub async fn add_video_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> Result<ApiResponse<EntPlaylist>, AppError> {
    let playlist = PlaylistService::from_state(&state)
        .add_video(viewer.user_id(), &video_id, &playlist_id)
        .await?;
    Ok(ApiResponse::ok(playlist, "Video added to playlist successfully"))
}

pub async fn remove_video_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> Result<ApiResponse<EntPlaylist>, AppError> {
    let playlist = PlaylistService::from_state(&state)
        .remove_video(viewer.user_id(), &video_id, &playlist_id)
        .await?;
    Ok(ApiResponse::ok(playlist, "Video removed from playlist successfully"))
}

pub async fn get_user_playlists_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<Vec<Value>>, AppError> {
    let playlists = PlaylistService::from_state(&state)
        .get_user_playlists(&user_id)
        .await?;
    Ok(ApiResponse::ok(playlists, "User playlists fetched successfully"))
}
