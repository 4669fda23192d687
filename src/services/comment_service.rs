use tracing::{info, instrument};

use super::required;
use crate::app_state::AppState;
use crate::core::{DocId, Timestamp};
use crate::entities::{EntComment, EntLike, EntVideo, Entity, Owned};
use crate::error::{AppError, AppResult};
use crate::feeds;
use crate::infrastructure::database::{DeleteOp, Store};
use crate::infrastructure::query::{Filter, Page, PageRequest, Update};

#[derive(Clone)]
pub struct CommentService {
    store: Store,
}

impl CommentService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.store.clone())
    }

    async fn existing_video(&self, video_id: &str) -> AppResult<DocId> {
        let id = DocId::parse(video_id, "videoId")?;
        if !EntVideo::exists(&self.store, id).await? {
            return Err(AppError::NotFound("Video not found".to_string()));
        }
        Ok(id)
    }

    pub async fn get_video_comments(
        &self,
        viewer: DocId,
        video_id: &str,
        page: PageRequest,
    ) -> AppResult<Page> {
        let video = self.existing_video(video_id).await?;
        feeds::video_comments(&self.store, video, viewer, page).await
    }

    #[instrument(skip(self, content))]
    pub async fn add_comment(
        &self,
        viewer: DocId,
        video_id: &str,
        content: Option<&str>,
    ) -> AppResult<EntComment> {
        let content = required(content, "Content is required")?;
        let video = self.existing_video(video_id).await?;

        let now = Timestamp::now();
        let comment = EntComment {
            id: DocId::new(),
            content,
            video,
            owner: viewer,
            created_at: now,
            updated_at: now,
        }
        .create(&self.store)
        .await?;

        info!(comment = %comment.id, video = %video, "comment added");
        Ok(comment)
    }

    #[instrument(skip(self, content))]
    pub async fn update_comment(
        &self,
        viewer: DocId,
        comment_id: &str,
        content: Option<&str>,
    ) -> AppResult<EntComment> {
        let content = required(content, "Content is required")?;
        let id = DocId::parse(comment_id, "commentId")?;
        let comment = EntComment::gen_enforce(&self.store, id).await?;
        comment.ensure_owner(viewer)?;

        EntComment::update_guarded(
            &self.store,
            id,
            EntComment::owner_guard(viewer),
            &[Update::set("content", content)],
        )
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    /// Deletes the comment together with its likes.
    #[instrument(skip(self))]
    pub async fn delete_comment(&self, viewer: DocId, comment_id: &str) -> AppResult<DocId> {
        let id = DocId::parse(comment_id, "commentId")?;
        let comment = EntComment::gen_enforce(&self.store, id).await?;
        comment.ensure_owner(viewer)?;

        let removed = self
            .store
            .delete_cascade(&[
                DeleteOp::new(
                    EntComment::COLLECTION,
                    Filter::eq("_id", id).and(EntComment::owner_guard(viewer)),
                ),
                DeleteOp::new(EntLike::COLLECTION, Filter::eq("comment", id)),
            ])
            .await?;
        if removed.first().copied().unwrap_or(0) == 0 {
            return Err(AppError::NotFound("Comment not found".to_string()));
        }

        info!(comment = %id, "comment deleted");
        Ok(id)
    }
}
