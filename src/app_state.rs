use std::sync::Arc;

use crate::{
    config::Config,
    error::AppResult,
    infrastructure::{
        database::Store, media::MediaService, security::SecurityService,
        sqlite_database::SqliteDocumentStore,
    },
};

/// Process-wide collaborators shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub media: MediaService,
    pub security: Arc<SecurityService>,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let database = SqliteDocumentStore::connect(&config.database.url).await?;

        let media = MediaService::from_config(&config.media)?;

        Ok(Self::from_parts(Arc::new(database), media, config))
    }

    /// Assemble state from already constructed collaborators.
    pub fn from_parts(store: Store, media: MediaService, config: Config) -> Self {
        let security = Arc::new(SecurityService::new(&config.auth));
        Self {
            store,
            media,
            security,
            config,
        }
    }
}
