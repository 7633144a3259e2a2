use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::sync::OnceCell;
use tracing::info;

use crate::{
    cache::{CacheBackend, DisabledCache, FragmentCache, MemoryCache},
    render::{JsonRenderer, Renderer},
    service::{
        feed::{FeedService, FeedSettings},
        follows::FollowGraph,
        store::EntityStore,
    },
};

pub mod cache;
pub mod config;
pub mod entity;
pub mod error;
pub mod ids;
pub mod models;
pub mod pagination;
pub mod render;
pub mod service;
pub mod telemetry;

#[cfg(test)]
mod test_utils;

static QUILL_CORE: OnceCell<Arc<QuillCore>> = OnceCell::const_new();

/// Process wide core, started from the on-disk config on first use.
pub async fn core() -> Result<Arc<QuillCore>, CoreError> {
    QUILL_CORE
        .get_or_try_init(|| async move { QuillCore::start().await.map(Arc::new) })
        .await
        .cloned()
}

/// Main runtime handle for Quill.
pub struct QuillCore {
    pub config: config::QuillConfig,

    pub db: DatabaseConnection,

    pub store: EntityStore,

    pub follows: FollowGraph,

    pub feed: FeedService,
}

impl QuillCore {
    /// Loads the config from the platform data dir, installs logging and
    /// starts the core.
    pub async fn start() -> Result<Self, CoreError> {
        let config = config::get_or_init().await?;
        telemetry::init(&config.logging)?;
        Self::start_with(config).await
    }

    /// Starts the core from an explicit config, leaving global logging alone.
    pub async fn start_with(config: config::QuillConfig) -> Result<Self, CoreError> {
        let db = models::open_or_create_db(&config).await?;
        models::migrate_up(&db).await?;

        let backend: Arc<dyn CacheBackend> = if config.cache.enabled {
            Arc::new(MemoryCache::new(config.cache.capacity))
        } else {
            Arc::new(DisabledCache)
        };
        let renderer: Arc<dyn Renderer> = Arc::new(JsonRenderer);

        let store = EntityStore::new(db.clone());
        let follows = FollowGraph::new(db.clone());
        let feed = FeedService::new(
            store.clone(),
            follows.clone(),
            FragmentCache::new(backend),
            renderer,
            FeedSettings::from(&config.feed),
        );

        info!(
            database = %config.database_path.display(),
            cache = config.cache.enabled,
            page_size = config.feed.page_size,
            "quill core started"
        );

        Ok(Self {
            config,
            db,
            store,
            follows,
            feed,
        })
    }

    pub async fn shutdown(self) -> Result<(), CoreError> {
        self.db.close().await?;
        info!("quill core stopped");
        Ok(())
    }
}

pub mod prelude {
    pub use super::cache;
    pub use super::config;
    pub use super::entity;
    pub use super::error;
    pub use super::ids;
    pub use super::models;
    pub use super::pagination::{Page, PageRequest};
    pub use super::render;
    pub use super::service;

    pub use super::service::feed::{FeedError, FeedService, Viewer};
    pub use super::service::follows::{FollowError, FollowGraph};
    pub use super::service::store::{EntityStore, NewPost, PostUpdate, StoreError};

    pub use super::{CoreError, QuillCore};
}

pub use error::CoreError;
