//! External media host.
//!
//! Uploads go through [`MediaService`], which owns the host client for the
//! whole process and always removes the local temporary file once the host
//! has seen it, whether the upload worked or not.

pub mod cloudinary;
pub mod local;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::MediaConfig;
use crate::error::AppResult;

pub use cloudinary::CloudinaryMediaHost;
pub use local::LocalMediaHost;

/// Resource-type hint passed along with a destroy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Image,
    Video,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Video => "video",
        }
    }
}

/// What the host hands back for a stored object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedMedia {
    pub url: String,
    pub public_id: String,
    pub resource_type: String,
    pub duration: Option<f64>,
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Store the file at `path`. The caller removes the file afterwards.
    async fn upload(&self, path: &Path) -> AppResult<UploadedMedia>;

    async fn destroy(&self, public_id: &str, kind: ResourceKind) -> AppResult<()>;
}

/// Process-wide media client injected into the services.
#[derive(Clone)]
pub struct MediaService {
    host: Arc<dyn MediaHost>,
}

impl MediaService {
    pub fn new(host: Arc<dyn MediaHost>) -> Self {
        Self { host }
    }

    pub fn from_config(config: &MediaConfig) -> AppResult<Self> {
        let host: Arc<dyn MediaHost> = match config {
            MediaConfig::Cloudinary(cfg) => Arc::new(CloudinaryMediaHost::new(cfg)?),
            MediaConfig::Local(cfg) => Arc::new(LocalMediaHost::new(cfg)?),
        };
        Ok(Self::new(host))
    }

    /// Upload a temporary file. Returns `None` when the host rejected it or
    /// could not be reached; the temporary file is gone either way.
    pub async fn upload(&self, path: &Path) -> Option<UploadedMedia> {
        let result = self.host.upload(path).await;

        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove temporary upload");
            }
        }

        match result {
            Ok(media) => {
                debug!(public_id = %media.public_id, "Media uploaded");
                Some(media)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Media upload failed");
                None
            }
        }
    }

    /// Best-effort removal; failures are logged and swallowed.
    pub async fn destroy(&self, public_id: &str, kind: ResourceKind) {
        if public_id.is_empty() {
            return;
        }
        if let Err(e) = self.host.destroy(public_id, kind).await {
            warn!(public_id = %public_id, kind = kind.as_str(), error = %e, "Media destroy failed");
        }
    }
}
