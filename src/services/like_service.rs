// LikeService - like toggles on videos, comments and tweets

use serde_json::Value;
use tracing::{debug, instrument};

use crate::app_state::AppState;
use crate::core::DocId;
use crate::entities::{EntComment, EntLike, EntTweet, EntVideo, Entity, LikeSubject};
use crate::error::{AppError, AppResult};
use crate::feeds;
use crate::infrastructure::database::Store;

#[derive(Clone)]
pub struct LikeService {
    store: Store,
}

impl LikeService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.store.clone())
    }

    pub async fn toggle_video_like(&self, viewer: DocId, video_id: &str) -> AppResult<bool> {
        let id = DocId::parse(video_id, "videoId")?;
        self.toggle(viewer, LikeSubject::Video(id)).await
    }

    pub async fn toggle_comment_like(&self, viewer: DocId, comment_id: &str) -> AppResult<bool> {
        let id = DocId::parse(comment_id, "commentId")?;
        self.toggle(viewer, LikeSubject::Comment(id)).await
    }

    pub async fn toggle_tweet_like(&self, viewer: DocId, tweet_id: &str) -> AppResult<bool> {
        let id = DocId::parse(tweet_id, "tweetId")?;
        self.toggle(viewer, LikeSubject::Tweet(id)).await
    }

    async fn subject_exists(&self, subject: LikeSubject) -> AppResult<bool> {
        match subject {
            LikeSubject::Video(id) => EntVideo::exists(&self.store, id).await,
            LikeSubject::Comment(id) => EntComment::exists(&self.store, id).await,
            LikeSubject::Tweet(id) => EntTweet::exists(&self.store, id).await,
        }
    }

    /// Remove the viewer's like if present, otherwise add one. Returns whether
    /// the subject is liked afterwards.
    #[instrument(skip(self))]
    pub async fn toggle(&self, viewer: DocId, subject: LikeSubject) -> AppResult<bool> {
        if !self.subject_exists(subject).await? {
            let name = match subject {
                LikeSubject::Video(_) => EntVideo::NAME,
                LikeSubject::Comment(_) => EntComment::NAME,
                LikeSubject::Tweet(_) => EntTweet::NAME,
            };
            return Err(AppError::NotFound(format!("{} not found", name)));
        }

        let removed = self
            .store
            .delete_one(EntLike::COLLECTION, &EntLike::filter_for(subject, viewer))
            .await?;
        if removed.is_some() {
            debug!(subject = ?subject, user = %viewer, "like removed");
            return Ok(false);
        }

        match EntLike::new(subject, viewer).create(&self.store).await {
            Ok(_) => {
                debug!(subject = ?subject, user = %viewer, "like added");
                Ok(true)
            }
            // A concurrent request inserted the same like first.
            Err(AppError::Conflict(_)) => Ok(true),
            Err(e) => Err(e),
        }
    }

    pub async fn get_liked_videos(&self, viewer: DocId) -> AppResult<Vec<Value>> {
        feeds::liked_videos(&self.store, viewer).await
    }
}
