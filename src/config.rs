use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub upload_temp_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub access_token_expiry_secs: u64,
    pub refresh_token_secret: String,
    pub refresh_token_expiry_secs: u64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_token_expiry_secs", &self.access_token_expiry_secs)
            .field("refresh_token_expiry_secs", &self.refresh_token_expiry_secs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MediaConfig {
    Cloudinary(CloudinaryConfig),
    Local(LocalMediaConfig),
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalMediaConfig {
    pub dir: PathBuf,
    pub public_base_url: String,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required(name: &str) -> AppResult<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::ConfigurationError(format!("{} must be set", name)))
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        let host = var_or("SERVER_HOST", "0.0.0.0");
        let port = var_or("SERVER_PORT", "8000").parse().unwrap_or(8000);

        let media = match var_or("MEDIA_BACKEND", "local").to_lowercase().as_str() {
            "cloudinary" => MediaConfig::Cloudinary(CloudinaryConfig {
                cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
                api_key: required("CLOUDINARY_API_KEY")?,
                api_secret: required("CLOUDINARY_API_SECRET")?,
            }),
            "local" => MediaConfig::Local(LocalMediaConfig {
                dir: PathBuf::from(var_or("LOCAL_MEDIA_DIR", "./public/media")),
                public_base_url: var_or("PUBLIC_BASE_URL", &format!("http://localhost:{}", port)),
            }),
            other => {
                return Err(AppError::ConfigurationError(format!(
                    "Unknown MEDIA_BACKEND '{}', expected 'cloudinary' or 'local'",
                    other
                )))
            }
        };

        Ok(Self {
            database: DatabaseConfig {
                url: var_or("DATABASE_URL", "sqlite:data/vidshare.db?mode=rwc"),
            },
            server: ServerConfig {
                host,
                port,
                cors_origin: var_or("CORS_ORIGIN", "*"),
                upload_temp_dir: PathBuf::from(var_or("UPLOAD_TEMP_DIR", "./public/temp")),
                max_upload_bytes: var_or("MAX_UPLOAD_BYTES", "209715200")
                    .parse()
                    .unwrap_or(200 * 1024 * 1024),
            },
            auth: AuthConfig {
                access_token_secret: var_or("ACCESS_TOKEN_SECRET", "change-me-access"),
                access_token_expiry_secs: var_or("ACCESS_TOKEN_EXPIRY_SECS", "86400")
                    .parse()
                    .unwrap_or(86400),
                refresh_token_secret: var_or("REFRESH_TOKEN_SECRET", "change-me-refresh"),
                refresh_token_expiry_secs: var_or("REFRESH_TOKEN_EXPIRY_SECS", "864000")
                    .parse()
                    .unwrap_or(864000),
            },
            media,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
