// EntSubscription - directed edge from a subscriber to a channel

use serde::{Deserialize, Serialize};

use super::Entity;
use crate::core::{DocId, Timestamp};

pub const COLLECTION: &str = "subscriptions";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntSubscription {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub subscriber: DocId,
    pub channel: DocId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EntSubscription {
    pub fn edge_key(subscriber: DocId, channel: DocId) -> String {
        format!("{}:{}", subscriber, channel)
    }
}

impl Entity for EntSubscription {
    const COLLECTION: &'static str = COLLECTION;
    const NAME: &'static str = "Subscription";

    fn id(&self) -> DocId {
        self.id
    }

    fn unique_keys(&self) -> Vec<String> {
        vec![Self::edge_key(self.subscriber, self.channel)]
    }
}
