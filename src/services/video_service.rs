// VideoService - upload, publish workflow and owner-gated edits

use serde_json::{json, Value};
use std::path::Path;
use tracing::{info, instrument};

use super::required;
use crate::app_state::AppState;
use crate::core::{DocId, Timestamp};
use crate::entities::{EntComment, EntLike, EntVideo, Entity, MediaAsset, Owned};
use crate::error::{AppError, AppResult};
use crate::feeds::{self, VideoFeedQuery};
use crate::infrastructure::database::{DeleteOp, Store};
use crate::infrastructure::media::{MediaService, ResourceKind, UploadedMedia};
use crate::infrastructure::query::{Filter, Page, Update};

#[derive(Debug, Default)]
pub struct PublishVideoInput<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub video_file: Option<&'a Path>,
    pub thumbnail: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct UpdateVideoInput<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub thumbnail: Option<&'a Path>,
}

#[derive(Clone)]
pub struct VideoService {
    store: Store,
    media: MediaService,
}

fn asset(media: &UploadedMedia) -> MediaAsset {
    MediaAsset {
        url: media.url.clone(),
        public_id: media.public_id.clone(),
    }
}

impl VideoService {
    pub fn new(store: Store, media: MediaService) -> Self {
        Self { store, media }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.store.clone(), state.media.clone())
    }

    pub async fn get_all_videos(&self, query: &VideoFeedQuery) -> AppResult<Page> {
        feeds::video_feed(&self.store, query).await
    }

    #[instrument(skip(self, input))]
    pub async fn publish_video(&self, viewer: DocId, input: PublishVideoInput<'_>) -> AppResult<EntVideo> {
        let title = required(input.title, "All fields are required")?;
        let description = required(input.description, "All fields are required")?;
        let video_path = input
            .video_file
            .ok_or_else(|| AppError::Validation("Video file is required".to_string()))?;
        let thumbnail_path = input
            .thumbnail
            .ok_or_else(|| AppError::Validation("Thumbnail is required".to_string()))?;

        let video_file = self
            .media
            .upload(video_path)
            .await
            .ok_or_else(|| AppError::Upstream("Failed to upload video file".to_string()))?;
        let Some(thumbnail) = self.media.upload(thumbnail_path).await else {
            self.media.destroy(&video_file.public_id, ResourceKind::Video).await;
            return Err(AppError::Upstream("Failed to upload thumbnail".to_string()));
        };

        let now = Timestamp::now();
        let video = EntVideo {
            id: DocId::new(),
            video_file: asset(&video_file),
            thumbnail: asset(&thumbnail),
            owner: viewer,
            title,
            description,
            duration: video_file.duration.unwrap_or(0.0),
            views: 0,
            is_published: false,
            created_at: now,
            updated_at: now,
        };

        match video.create(&self.store).await {
            Ok(video) => {
                info!(video = %video.id, owner = %viewer, "video uploaded");
                Ok(video)
            }
            Err(e) => {
                self.media.destroy(&video_file.public_id, ResourceKind::Video).await;
                self.media.destroy(&thumbnail.public_id, ResourceKind::Image).await;
                Err(e)
            }
        }
    }

    /// Published videos are visible to everyone, unpublished ones only to
    /// their owner. Each successful read counts as one view.
    #[instrument(skip(self))]
    pub async fn get_video_by_id(&self, viewer: DocId, video_id: &str) -> AppResult<EntVideo> {
        let id = DocId::parse(video_id, "videoId")?;
        let video = EntVideo::gen_enforce(&self.store, id).await?;
        if !video.is_published && video.owner != viewer {
            return Err(AppError::NotFound("Video not found".to_string()));
        }

        EntVideo::update_guarded(&self.store, id, Filter::All, &[Update::inc("views", 1)])
            .await?
            .ok_or_else(|| AppError::NotFound("Video not found".to_string()))
    }

    #[instrument(skip(self, input))]
    pub async fn update_video(
        &self,
        viewer: DocId,
        video_id: &str,
        input: UpdateVideoInput<'_>,
    ) -> AppResult<EntVideo> {
        let id = DocId::parse(video_id, "videoId")?;
        let title = required(input.title, "Title is required")?;
        let description = required(input.description, "Description is required")?;

        let video = EntVideo::gen_enforce(&self.store, id).await?;
        video.ensure_owner(viewer)?;

        let mut updates = vec![Update::set("title", title), Update::set("description", description)];
        let thumbnail = match input.thumbnail {
            Some(path) => {
                let uploaded = self
                    .media
                    .upload(path)
                    .await
                    .ok_or_else(|| AppError::Upstream("Failed to upload thumbnail".to_string()))?;
                updates.push(Update::set("thumbnail", serde_json::to_value(asset(&uploaded))?));
                Some(uploaded)
            }
            None => None,
        };

        let updated = EntVideo::update_guarded(&self.store, id, EntVideo::owner_guard(viewer), &updates).await;
        match (updated, thumbnail) {
            (Ok(Some(updated)), Some(_)) => {
                self.media
                    .destroy(&video.thumbnail.public_id, ResourceKind::Image)
                    .await;
                Ok(updated)
            }
            (Ok(Some(updated)), None) => Ok(updated),
            (result, new_thumbnail) => {
                if let Some(uploaded) = new_thumbnail {
                    self.media.destroy(&uploaded.public_id, ResourceKind::Image).await;
                }
                result?.ok_or_else(|| AppError::NotFound("Video not found".to_string()))
            }
        }
    }

    /// Removes the video, its likes, its comments and their likes in one
    /// store transaction, then the hosted files.
    #[instrument(skip(self))]
    pub async fn delete_video(&self, viewer: DocId, video_id: &str) -> AppResult<()> {
        let id = DocId::parse(video_id, "videoId")?;
        let video = EntVideo::gen_enforce(&self.store, id).await?;
        video.ensure_owner(viewer)?;

        let comment_ids: Vec<DocId> = EntComment::gen_all(&self.store, &Filter::eq("video", id))
            .await?
            .into_iter()
            .map(|comment| comment.id)
            .collect();

        let removed = self
            .store
            .delete_cascade(&[
                DeleteOp::new(
                    EntVideo::COLLECTION,
                    Filter::eq("_id", id).and(EntVideo::owner_guard(viewer)),
                ),
                DeleteOp::new(EntLike::COLLECTION, Filter::eq("video", id)),
                DeleteOp::new(EntLike::COLLECTION, Filter::is_in("comment", comment_ids)),
                DeleteOp::new(EntComment::COLLECTION, Filter::eq("video", id)),
            ])
            .await?;

        if removed.first().copied().unwrap_or(0) == 0 {
            return Err(AppError::NotFound("Video not found".to_string()));
        }
        info!(video = %id, ?removed, "video deleted");

        self.media
            .destroy(&video.thumbnail.public_id, ResourceKind::Image)
            .await;
        self.media
            .destroy(&video.video_file.public_id, ResourceKind::Video)
            .await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn toggle_publish_status(&self, viewer: DocId, video_id: &str) -> AppResult<Value> {
        let id = DocId::parse(video_id, "videoId")?;
        let video = EntVideo::gen_enforce(&self.store, id).await?;
        video.ensure_owner(viewer)?;

        let toggled = EntVideo::update_guarded(
            &self.store,
            id,
            EntVideo::owner_guard(viewer),
            &[Update::toggle("isPublished")],
        )
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

        Ok(json!({ "isPublished": toggled.is_published }))
    }
}
