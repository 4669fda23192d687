use serde_json::Value;
use tracing::{info, instrument};

use super::required;
use crate::app_state::AppState;
use crate::core::{DocId, Timestamp};
use crate::entities::{EntLike, EntTweet, EntUser, Entity, Owned};
use crate::error::{AppError, AppResult};
use crate::feeds;
use crate::infrastructure::database::{DeleteOp, Store};
use crate::infrastructure::query::{Filter, Update};

#[derive(Clone)]
pub struct TweetService {
    store: Store,
}

impl TweetService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.store.clone())
    }

    #[instrument(skip(self, content))]
    pub async fn create_tweet(&self, viewer: DocId, content: Option<&str>) -> AppResult<EntTweet> {
        let content = required(content, "Content is required")?;

        let now = Timestamp::now();
        let tweet = EntTweet {
            id: DocId::new(),
            content,
            owner: viewer,
            created_at: now,
            updated_at: now,
        }
        .create(&self.store)
        .await?;

        info!(tweet = %tweet.id, owner = %viewer, "tweet created");
        Ok(tweet)
    }

    pub async fn get_user_tweets(&self, viewer: DocId, user_id: &str) -> AppResult<Vec<Value>> {
        let user = DocId::parse(user_id, "userId")?;
        if !EntUser::exists(&self.store, user).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        feeds::user_tweets(&self.store, user, viewer).await
    }

    #[instrument(skip(self, content))]
    pub async fn update_tweet(
        &self,
        viewer: DocId,
        tweet_id: &str,
        content: Option<&str>,
    ) -> AppResult<EntTweet> {
        let content = required(content, "Content is required")?;
        let id = DocId::parse(tweet_id, "tweetId")?;
        let tweet = EntTweet::gen_enforce(&self.store, id).await?;
        tweet.ensure_owner(viewer)?;

        EntTweet::update_guarded(
            &self.store,
            id,
            EntTweet::owner_guard(viewer),
            &[Update::set("content", content)],
        )
        .await?
        .ok_or_else(|| AppError::NotFound("Tweet not found".to_string()))
    }

    /// Deletes the tweet together with its likes.
    #[instrument(skip(self))]
    pub async fn delete_tweet(&self, viewer: DocId, tweet_id: &str) -> AppResult<DocId> {
        let id = DocId::parse(tweet_id, "tweetId")?;
        let tweet = EntTweet::gen_enforce(&self.store, id).await?;
        tweet.ensure_owner(viewer)?;

        let removed = self
            .store
            .delete_cascade(&[
                DeleteOp::new(
                    EntTweet::COLLECTION,
                    Filter::eq("_id", id).and(EntTweet::owner_guard(viewer)),
                ),
                DeleteOp::new(EntLike::COLLECTION, Filter::eq("tweet", id)),
            ])
            .await?;
        if removed.first().copied().unwrap_or(0) == 0 {
            return Err(AppError::NotFound("Tweet not found".to_string()));
        }

        info!(tweet = %id, "tweet deleted");
        Ok(id)
    }
}
