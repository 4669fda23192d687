// Entities - typed views over the document collections

pub mod ent_comment;
pub mod ent_like;
pub mod ent_playlist;
pub mod ent_subscription;
pub mod ent_tweet;
pub mod ent_user;
pub mod ent_video;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::DocId;
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::Store;
use crate::infrastructure::query::{Filter, Update};

pub use ent_comment::EntComment;
pub use ent_like::{EntLike, LikeSubject};
pub use ent_playlist::EntPlaylist;
pub use ent_subscription::EntSubscription;
pub use ent_tweet::EntTweet;
pub use ent_user::{EntUser, PublicUser};
pub use ent_video::EntVideo;

/// Reference to an object stored on the media host.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaAsset {
    pub url: String,
    pub public_id: String,
}

/// Entity trait implemented by every stored record type.
#[async_trait]
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Sized {
    /// Collection the documents live in
    const COLLECTION: &'static str;
    /// Human-readable name used in error messages
    const NAME: &'static str;

    fn id(&self) -> DocId;

    fn from_document(doc: Value) -> AppResult<Self> {
        serde_json::from_value(doc).map_err(|e| {
            AppError::Internal(format!("Malformed {} document: {}", Self::NAME, e))
        })
    }

    fn to_document(&self) -> AppResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Unique keys claimed by this record on insert
    fn unique_keys(&self) -> Vec<String> {
        Vec::new()
    }

    async fn create(self, store: &Store) -> AppResult<Self> {
        let keys = self.unique_keys();
        let stored = store
            .insert(Self::COLLECTION, self.to_document()?, &keys)
            .await?;
        Self::from_document(stored)
    }

    async fn gen_nullable(store: &Store, id: DocId) -> AppResult<Option<Self>> {
        store
            .find_by_id(Self::COLLECTION, id)
            .await?
            .map(Self::from_document)
            .transpose()
    }

    async fn gen_enforce(store: &Store, id: DocId) -> AppResult<Self> {
        Self::gen_nullable(store, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} not found", Self::NAME)))
    }

    async fn gen_one(store: &Store, filter: &Filter) -> AppResult<Option<Self>> {
        store
            .find_one(Self::COLLECTION, filter)
            .await?
            .map(Self::from_document)
            .transpose()
    }

    async fn gen_all(store: &Store, filter: &Filter) -> AppResult<Vec<Self>> {
        store
            .find(Self::COLLECTION, filter)
            .await?
            .into_iter()
            .map(Self::from_document)
            .collect()
    }

    async fn exists(store: &Store, id: DocId) -> AppResult<bool> {
        store.exists(Self::COLLECTION, &Filter::eq("_id", id)).await
    }

    /// Apply `updates` to this record if it still matches `guard`.
    async fn update_guarded(
        store: &Store,
        id: DocId,
        guard: Filter,
        updates: &[Update],
    ) -> AppResult<Option<Self>> {
        store
            .find_one_and_update(Self::COLLECTION, &Filter::eq("_id", id).and(guard), updates)
            .await?
            .map(Self::from_document)
            .transpose()
    }
}

/// Records stamped with an owning user at creation.
pub trait Owned: Entity {
    fn owner(&self) -> DocId;

    /// The acting identity must equal the stored owner.
    fn ensure_owner(&self, viewer: DocId) -> AppResult<()> {
        if self.owner() == viewer {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "You are not allowed to modify this {}",
                Self::NAME.to_lowercase()
            )))
        }
    }

    /// Filter matching this record only while `viewer` still owns it.
    fn owner_guard(viewer: DocId) -> Filter {
        Filter::eq("owner", viewer)
    }
}
