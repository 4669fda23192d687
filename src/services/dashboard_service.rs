use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::app_state::AppState;
use crate::core::DocId;
use crate::entities::{EntSubscription, EntVideo, Entity};
use crate::error::AppResult;
use crate::feeds;
use crate::infrastructure::database::Store;
use crate::infrastructure::query::Filter;

/// Aggregate numbers for a channel's dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub total_subscribers: u64,
    pub total_likes: u64,
    pub total_views: u64,
    pub total_videos: u64,
}

#[derive(Clone)]
pub struct DashboardService {
    store: Store,
}

impl DashboardService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.store.clone())
    }

    #[instrument(skip(self))]
    pub async fn get_channel_stats(&self, viewer: DocId) -> AppResult<ChannelStats> {
        let total_subscribers = self
            .store
            .count(EntSubscription::COLLECTION, &Filter::eq("channel", viewer))
            .await?;

        let totals = self
            .store
            .aggregate(EntVideo::COLLECTION, &feeds::channel_stats_pipeline(viewer))
            .await?
            .into_iter()
            .next()
            .unwrap_or(Value::Null);
        let number = |field: &str| totals.get(field).and_then(Value::as_u64).unwrap_or(0);

        Ok(ChannelStats {
            total_subscribers,
            total_likes: number("totalLikes"),
            total_views: number("totalViews"),
            total_videos: number("totalVideos"),
        })
    }

    pub async fn get_channel_videos(&self, viewer: DocId) -> AppResult<Vec<Value>> {
        feeds::channel_videos(&self.store, viewer).await
    }
}
