// PlaylistService - owner-managed video lists

use serde_json::Value;
use tracing::{info, instrument};

use super::required;
use crate::app_state::AppState;
use crate::core::{DocId, Timestamp};
use crate::entities::{EntPlaylist, EntVideo, Entity, Owned};
use crate::error::{AppError, AppResult};
use crate::feeds;
use crate::infrastructure::database::Store;
use crate::infrastructure::query::{Filter, Update};

const NAME_AND_DESCRIPTION: &str = "Name and description both are required";

#[derive(Clone)]
pub struct PlaylistService {
    store: Store,
}

impl PlaylistService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.store.clone())
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        viewer: DocId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> AppResult<EntPlaylist> {
        let name = required(name, NAME_AND_DESCRIPTION)?;
        let description = required(description, NAME_AND_DESCRIPTION)?;

        let now = Timestamp::now();
        let playlist = EntPlaylist {
            id: DocId::new(),
            name,
            description,
            videos: Vec::new(),
            owner: viewer,
            created_at: now,
            updated_at: now,
        }
        .create(&self.store)
        .await?;

        info!(playlist = %playlist.id, owner = %viewer, "playlist created");
        Ok(playlist)
    }

    /// Load a playlist and check that `viewer` owns it.
    async fn load_owned(&self, viewer: DocId, playlist_id: &str) -> AppResult<EntPlaylist> {
        let id = DocId::parse(playlist_id, "playlistId")?;
        let playlist = EntPlaylist::gen_enforce(&self.store, id).await?;
        playlist.ensure_owner(viewer)?;
        Ok(playlist)
    }

    async fn apply(&self, viewer: DocId, playlist: DocId, updates: &[Update]) -> AppResult<EntPlaylist> {
        EntPlaylist::update_guarded(&self.store, playlist, EntPlaylist::owner_guard(viewer), updates)
            .await?
            .ok_or_else(|| AppError::NotFound("Playlist not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        viewer: DocId,
        playlist_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> AppResult<EntPlaylist> {
        let name = required(name, NAME_AND_DESCRIPTION)?;
        let description = required(description, NAME_AND_DESCRIPTION)?;
        let playlist = self.load_owned(viewer, playlist_id).await?;

        self.apply(
            viewer,
            playlist.id,
            &[Update::set("name", name), Update::set("description", description)],
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, viewer: DocId, playlist_id: &str) -> AppResult<()> {
        let playlist = self.load_owned(viewer, playlist_id).await?;
        self.store
            .delete_one(
                EntPlaylist::COLLECTION,
                &Filter::eq("_id", playlist.id).and(EntPlaylist::owner_guard(viewer)),
            )
            .await?
            .ok_or_else(|| AppError::NotFound("Playlist not found".to_string()))?;

        info!(playlist = %playlist.id, "playlist deleted");
        Ok(())
    }

    /// Adding a video that is already in the playlist leaves it unchanged.
    #[instrument(skip(self))]
    pub async fn add_video(&self, viewer: DocId, video_id: &str, playlist_id: &str) -> AppResult<EntPlaylist> {
        let video = DocId::parse(video_id, "videoId")?;
        let playlist = self.load_owned(viewer, playlist_id).await?;
        if !EntVideo::exists(&self.store, video).await? {
            return Err(AppError::NotFound("Video not found".to_string()));
        }

        self.apply(viewer, playlist.id, &[Update::add_to_set("videos", video)])
            .await
    }

    #[instrument(skip(self))]
    pub async fn remove_video(&self, viewer: DocId, video_id: &str, playlist_id: &str) -> AppResult<EntPlaylist> {
        let video = DocId::parse(video_id, "videoId")?;
        let playlist = self.load_owned(viewer, playlist_id).await?;

        self.apply(viewer, playlist.id, &[Update::pull("videos", video)])
            .await
    }

    pub async fn get_playlist_by_id(&self, playlist_id: &str) -> AppResult<Value> {
        let id = DocId::parse(playlist_id, "playlistId")?;
        feeds::playlist_contents(&self.store, id).await
    }

    pub async fn get_user_playlists(&self, user_id: &str) -> AppResult<Vec<Value>> {
        let user = DocId::parse(user_id, "userId")?;
        feeds::user_playlists(&self.store, user).await
    }
}
