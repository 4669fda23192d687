use serde_json::Value;
use tracing::{debug, instrument};

use crate::app_state::AppState;
use crate::core::{DocId, Timestamp};
use crate::entities::{EntSubscription, EntUser, Entity};
use crate::error::{AppError, AppResult};
use crate::feeds;
use crate::infrastructure::database::Store;
use crate::infrastructure::query::Filter;

#[derive(Clone)]
pub struct SubscriptionService {
    store: Store,
}

impl SubscriptionService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.store.clone())
    }

    /// Subscribe to `channel` or drop the existing subscription. Returns
    /// whether the viewer is subscribed afterwards.
    #[instrument(skip(self))]
    pub async fn toggle_subscription(&self, viewer: DocId, channel_id: &str) -> AppResult<bool> {
        let channel = DocId::parse(channel_id, "channelId")?;
        if channel == viewer {
            return Err(AppError::Validation(
                "You cannot subscribe to your own channel".to_string(),
            ));
        }
        if !EntUser::exists(&self.store, channel).await? {
            return Err(AppError::NotFound("Channel not found".to_string()));
        }

        let edge = Filter::eq("subscriber", viewer).and(Filter::eq("channel", channel));
        if self
            .store
            .delete_one(EntSubscription::COLLECTION, &edge)
            .await?
            .is_some()
        {
            debug!(subscriber = %viewer, channel = %channel, "unsubscribed");
            return Ok(false);
        }

        let now = Timestamp::now();
        let subscription = EntSubscription {
            id: DocId::new(),
            subscriber: viewer,
            channel,
            created_at: now,
            updated_at: now,
        };
        match subscription.create(&self.store).await {
            Ok(_) => {
                debug!(subscriber = %viewer, channel = %channel, "subscribed");
                Ok(true)
            }
            Err(AppError::Conflict(_)) => Ok(true),
            Err(e) => Err(e),
        }
    }

    pub async fn get_channel_subscribers(&self, viewer: DocId, channel_id: &str) -> AppResult<Vec<Value>> {
        let channel = DocId::parse(channel_id, "channelId")?;
        feeds::subscribers(&self.store, channel, viewer).await
    }

    pub async fn get_subscribed_channels(&self, subscriber_id: &str) -> AppResult<Vec<Value>> {
        let subscriber = DocId::parse(subscriber_id, "subscriberId")?;
        feeds::subscribed_channels(&self.store, subscriber).await
    }
}
