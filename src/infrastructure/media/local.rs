//! Filesystem-backed media host for development. Files are copied into a
//! directory that the HTTP server exposes under `/media`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use super::{MediaHost, ResourceKind, UploadedMedia};
use crate::config::LocalMediaConfig;
use crate::error::{AppError, AppResult};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "mkv", "avi", "m4v"];

pub struct LocalMediaHost {
    dir: PathBuf,
    public_base_url: String,
}

fn kind_for(path: &Path) -> (ResourceKind, String) {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string());
    let kind = if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        ResourceKind::Video
    } else {
        ResourceKind::Image
    };
    (kind, ext)
}

impl LocalMediaHost {
    pub fn new(cfg: &LocalMediaConfig) -> AppResult<Self> {
        std::fs::create_dir_all(&cfg.dir).map_err(|e| {
            AppError::ConfigurationError(format!(
                "Cannot create media directory {}: {e}",
                cfg.dir.display()
            ))
        })?;
        info!(dir = %cfg.dir.display(), "Local media host initialized");

        Ok(Self {
            dir: cfg.dir.clone(),
            public_base_url: cfg.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn resolve(&self, public_id: &str) -> AppResult<PathBuf> {
        if public_id.contains("..") || public_id.starts_with('/') {
            return Err(AppError::Validation(format!("Invalid media id: {public_id}")));
        }
        Ok(self.dir.join(public_id))
    }
}

#[async_trait]
impl MediaHost for LocalMediaHost {
    async fn upload(&self, path: &Path) -> AppResult<UploadedMedia> {
        let (kind, ext) = kind_for(path);
        let public_id = format!("{}/{}.{}", kind.as_str(), Uuid::new_v4(), ext);
        let target = self.resolve(&public_id)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Upstream(format!("Cannot create media folder: {e}")))?;
        }
        tokio::fs::copy(path, &target)
            .await
            .map_err(|e| AppError::Upstream(format!("Cannot store media: {e}")))?;

        Ok(UploadedMedia {
            url: format!("{}/media/{}", self.public_base_url, public_id),
            public_id,
            resource_type: kind.as_str().to_string(),
            duration: None,
        })
    }

    async fn destroy(&self, public_id: &str, _kind: ResourceKind) -> AppResult<()> {
        let target = self.resolve(public_id)?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| AppError::Upstream(format!("Cannot remove media {public_id}: {e}")))
    }
}
