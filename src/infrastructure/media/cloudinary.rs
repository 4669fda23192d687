//! Cloudinary REST upload API client.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::path::Path;
use tracing::{info, instrument};

use super::{MediaHost, ResourceKind, UploadedMedia};
use crate::config::CloudinaryConfig;
use crate::error::{AppError, AppResult};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

pub struct CloudinaryMediaHost {
    cloud_name: String,
    api_key: String,
    api_secret: String,
    http_client: Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    public_id: String,
    resource_type: String,
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Sign request parameters: `k=v` pairs sorted by key, joined with `&`,
/// followed by the API secret, hashed with SHA-1.
pub fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

impl CloudinaryMediaHost {
    pub fn new(cfg: &CloudinaryConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .build()
            .map_err(|e| AppError::ConfigurationError(format!("Failed to create HTTP client: {e}")))?;

        info!(cloud = %cfg.cloud_name, "Cloudinary media host initialized");

        Ok(Self {
            cloud_name: cfg.cloud_name.clone(),
            api_key: cfg.api_key.clone(),
            api_secret: cfg.api_secret.clone(),
            http_client,
        })
    }

    fn endpoint(&self, resource: &str, action: &str) -> String {
        format!("{}/{}/{}/{}", API_BASE, self.cloud_name, resource, action)
    }

    async fn send(&self, url: String, form: Form) -> AppResult<reqwest::Response> {
        let response = self
            .http_client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Media host unreachable: {e}")))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => status.to_string(),
        };
        Err(AppError::Upstream(format!("Media host rejected request: {message}")))
    }
}

#[async_trait]
impl MediaHost for CloudinaryMediaHost {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn upload(&self, path: &Path) -> AppResult<UploadedMedia> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::Validation(format!("Unreadable upload: {e}")))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(&[("timestamp", &timestamp)], &self.api_secret);

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);

        let body: UploadResponse = self
            .send(self.endpoint("auto", "upload"), form)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed media host response: {e}")))?;

        let url = body
            .secure_url
            .or(body.url)
            .ok_or_else(|| AppError::Upstream("Media host returned no URL".into()))?;

        Ok(UploadedMedia {
            url,
            public_id: body.public_id,
            resource_type: body.resource_type,
            duration: body.duration,
        })
    }

    #[instrument(skip(self))]
    async fn destroy(&self, public_id: &str, kind: ResourceKind) -> AppResult<()> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let form = Form::new()
            .text("public_id", public_id.to_string())
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);

        self.send(self.endpoint(kind.as_str(), "destroy"), form)
            .await
            .map(|_| ())
    }
}
