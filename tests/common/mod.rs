// Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use vidshare::app_state::AppState;
use vidshare::config::{
    AuthConfig, Config, DatabaseConfig, LocalMediaConfig, MediaConfig, ServerConfig,
};
use vidshare::core::DocId;
use vidshare::entities::{EntVideo, PublicUser};
use vidshare::error::AppResult;
use vidshare::infrastructure::media::{MediaHost, MediaService, ResourceKind, UploadedMedia};
use vidshare::infrastructure::sqlite_database::SqliteDocumentStore;
use vidshare::services::{PublishVideoInput, RegisterInput, UserService, VideoService};

pub const PASSWORD: &str = "correct horse battery staple";

/// Media host that keeps everything in memory and records destroy calls.
#[derive(Default)]
pub struct RecordingHost {
    next: AtomicU64,
    pub uploaded: Mutex<Vec<String>>,
    pub destroyed: Mutex<Vec<String>>,
}

#[async_trait]
impl MediaHost for RecordingHost {
    async fn upload(&self, path: &Path) -> AppResult<UploadedMedia> {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let is_video = path.extension().and_then(|e| e.to_str()) == Some("mp4");
        let (kind, duration) = if is_video {
            ("video", Some(42.5))
        } else {
            ("image", None)
        };
        let public_id = format!("{}/{}", kind, n);
        self.uploaded.lock().unwrap().push(public_id.clone());

        Ok(UploadedMedia {
            url: format!("https://media.test/{}", public_id),
            public_id,
            resource_type: kind.to_string(),
            duration,
        })
    }

    async fn destroy(&self, public_id: &str, _kind: ResourceKind) -> AppResult<()> {
        self.destroyed.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub host: Arc<RecordingHost>,
    pub dir: TempDir,
}

pub fn test_config(dir: &Path) -> Config {
    Config {
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origin: "*".to_string(),
            upload_temp_dir: dir.join("temp"),
            max_upload_bytes: 10 * 1024 * 1024,
        },
        auth: AuthConfig {
            access_token_secret: "test-access-secret".to_string(),
            access_token_expiry_secs: 3600,
            refresh_token_secret: "test-refresh-secret".to_string(),
            refresh_token_expiry_secs: 86400,
        },
        media: MediaConfig::Local(LocalMediaConfig {
            dir: dir.join("media"),
            public_base_url: "http://localhost".to_string(),
        }),
    }
}

pub async fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteDocumentStore::new_in_memory().await.unwrap();
    let host = Arc::new(RecordingHost::default());
    let media = MediaService::new(host.clone());
    let state = AppState::from_parts(Arc::new(store), media, test_config(dir.path()));

    TestApp { state, host, dir }
}

impl TestApp {
    /// Write a throwaway upload into the temp directory.
    pub fn upload_file(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(format!("{}-{}", DocId::new(), name));
        std::fs::write(&path, b"not really media").unwrap();
        path
    }

    pub fn users(&self) -> UserService {
        UserService::from_state(&self.state)
    }

    pub fn videos(&self) -> VideoService {
        VideoService::from_state(&self.state)
    }

    pub async fn register(&self, username: &str) -> PublicUser {
        let avatar = self.upload_file("avatar.png");
        let email = format!("{}@example.com", username);
        self.users()
            .register(RegisterInput {
                full_name: Some("Test User"),
                email: Some(&email),
                username: Some(username),
                password: Some(PASSWORD),
                avatar: Some(&avatar),
                cover_image: None,
            })
            .await
            .unwrap()
    }

    /// Upload a video for `owner`; it starts unpublished.
    pub async fn publish(&self, owner: DocId, title: &str) -> EntVideo {
        let file = self.upload_file("clip.mp4");
        let thumbnail = self.upload_file("thumb.png");
        self.videos()
            .publish_video(
                owner,
                PublishVideoInput {
                    title: Some(title),
                    description: Some("a test video"),
                    video_file: Some(&file),
                    thumbnail: Some(&thumbnail),
                },
            )
            .await
            .unwrap()
    }

    /// Upload a video and flip it to published.
    pub async fn publish_visible(&self, owner: DocId, title: &str) -> EntVideo {
        let video = self.publish(owner, title).await;
        self.videos()
            .toggle_publish_status(owner, &video.id.to_string())
            .await
            .unwrap();
        video
    }
}
