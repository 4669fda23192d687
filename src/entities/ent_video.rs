// EntVideo - uploaded video with its hosted file and thumbnail

use serde::{Deserialize, Serialize};

use super::{Entity, MediaAsset, Owned};
use crate::core::{DocId, Timestamp};

pub const COLLECTION: &str = "videos";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntVideo {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub video_file: MediaAsset,
    pub thumbnail: MediaAsset,
    pub owner: DocId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub is_published: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Entity for EntVideo {
    const COLLECTION: &'static str = COLLECTION;
    const NAME: &'static str = "Video";

    fn id(&self) -> DocId {
        self.id
    }
}

impl Owned for EntVideo {
    fn owner(&self) -> DocId {
        self.owner
    }
}
