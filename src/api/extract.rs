// Request extractors shared by the route handlers

use axum::{
    extract::{FromRequest, Multipart, Request},
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

static FILE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.([A-Za-z0-9]{1,8})$").expect("Invalid extension regex"));

/// JSON body whose rejections use the error envelope instead of axum's
/// plain-text responses.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

/// A spooled upload. The file is removed when the guard is dropped, so a
/// request that fails before the media host sees the file leaves nothing
/// behind.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        // Usually already gone: the media service deletes after uploading.
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Multipart form with text fields in memory and file fields on disk.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, TempUpload>,
}

impl MultipartForm {
    /// Drain `multipart`, writing every file part into `temp_dir` under a
    /// random name that keeps the original extension.
    pub async fn read(mut multipart: Multipart, temp_dir: &Path) -> AppResult<Self> {
        tokio::fs::create_dir_all(temp_dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to prepare upload directory: {}", e)))?;

        let mut form = MultipartForm::default();
        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            let file_name = match field.file_name() {
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(e.body_text()))?;
                    form.fields.insert(name, text);
                    continue;
                }
                Some("") => continue,
                Some(file_name) => file_name.to_string(),
            };

            let upload = TempUpload {
                path: temp_dir.join(spooled_name(&file_name)),
            };
            let mut file = tokio::fs::File::create(upload.path())
                .await
                .map_err(|e| AppError::Internal(format!("Failed to spool upload: {}", e)))?;
            let mut written = 0usize;
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?
            {
                written += chunk.len();
                file.write_all(&chunk)
                    .await
                    .map_err(|e| AppError::Internal(format!("Failed to spool upload: {}", e)))?;
            }
            file.flush()
                .await
                .map_err(|e| AppError::Internal(format!("Failed to spool upload: {}", e)))?;

            debug!(field = %name, bytes = written, path = %upload.path().display(), "upload spooled");
            form.files.insert(name, upload);
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn file(&self, name: &str) -> Option<&Path> {
        self.files.get(name).map(TempUpload::path)
    }
}

/// Random file name carrying over a short alphanumeric extension, if any.
fn spooled_name(original: &str) -> String {
    match FILE_EXTENSION.captures(original).and_then(|c| c.get(1)) {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.as_str().to_lowercase()),
        None => Uuid::new_v4().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spooled_name_keeps_extension() {
        let name = spooled_name("holiday clip.MP4");
        assert!(name.ends_with(".mp4"));
        assert!(!name.contains(' '));
    }

    #[test]
    fn test_spooled_name_drops_unsafe_extension() {
        let name = spooled_name("../../etc/passwd");
        assert!(!name.contains('/'));
        assert!(!name.contains('.'));

        let name = spooled_name("archive.tar.gz;rm");
        assert!(!name.contains(';'));
    }

    #[test]
    fn test_temp_upload_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spooled.bin");
        std::fs::write(&path, b"bytes").unwrap();

        drop(TempUpload { path: path.clone() });
        assert!(!path.exists());
    }
}
