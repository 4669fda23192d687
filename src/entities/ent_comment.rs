use serde::{Deserialize, Serialize};

use super::{Entity, Owned};
use crate::core::{DocId, Timestamp};

pub const COLLECTION: &str = "comments";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntComment {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub content: String,
    pub video: DocId,
    pub owner: DocId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Entity for EntComment {
    const COLLECTION: &'static str = COLLECTION;
    const NAME: &'static str = "Comment";

    fn id(&self) -> DocId {
        self.id
    }
}

impl Owned for EntComment {
    fn owner(&self) -> DocId {
        self.owner
    }
}
