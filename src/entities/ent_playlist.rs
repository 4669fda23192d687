// EntPlaylist - ordered, deduplicated list of video references

use serde::{Deserialize, Serialize};

use super::{Entity, Owned};
use crate::core::{DocId, Timestamp};

pub const COLLECTION: &str = "playlists";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntPlaylist {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub videos: Vec<DocId>,
    pub owner: DocId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Entity for EntPlaylist {
    const COLLECTION: &'static str = COLLECTION;
    const NAME: &'static str = "Playlist";

    fn id(&self) -> DocId {
        self.id
    }
}

impl Owned for EntPlaylist {
    fn owner(&self) -> DocId {
        self.owner
    }
}
