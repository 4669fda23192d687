use serde::{Deserialize, Serialize};

use super::{Entity, Owned};
use crate::core::{DocId, Timestamp};

pub const COLLECTION: &str = "tweets";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntTweet {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub content: String,
    pub owner: DocId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Entity for EntTweet {
    const COLLECTION: &'static str = COLLECTION;
    const NAME: &'static str = "Tweet";

    fn id(&self) -> DocId {
        self.id
    }
}

impl Owned for EntTweet {
    fn owner(&self) -> DocId {
        self.owner
    }
}
