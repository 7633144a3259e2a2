use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

static DATA_DIR_NAME: &str = "quill";
static QUILL_DB_NAME: &str = "quill_db.sqlite";
static CONFIG_FILE_NAME: &str = "config.json";

// data_dir_path
// |- quill
//    |- quill_db.sqlite
//    |- config.json

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to find a data directory on this platform")]
    NoDataDir,

    #[error("config io error")]
    Io(#[from] std::io::Error),

    #[error("malformed config file")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QuillConfig {
    pub database_path: PathBuf,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Posts per page, shared by every feed.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// How long a rendered global feed page is served from cache.
    #[serde(default = "default_index_cache_ttl_secs")]
    pub index_cache_ttl_secs: u64,
}

impl FeedConfig {
    pub fn index_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.index_cache_ttl_secs)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            index_cache_ttl_secs: default_index_cache_ttl_secs(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// When false every read recomputes.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of entries kept by the in-memory backend.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_cache_capacity(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

fn default_page_size() -> usize {
    10
}

fn default_index_cache_ttl_secs() -> u64 {
    20
}

fn default_cache_capacity() -> usize {
    1024
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl QuillConfig {
    /// Creates a config with default settings rooted at `data_dir`
    pub fn new(data_dir: &Path) -> Self {
        QuillConfig {
            database_path: data_dir.join(QUILL_DB_NAME),
            feed: FeedConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Gets the existing config from the platform data directory, or writes a
/// default one there first.
pub async fn get_or_init() -> Result<QuillConfig, ConfigError> {
    let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
    load_or_init(&data_dir.join(DATA_DIR_NAME)).await
}

/// Same as [`get_or_init`] for an explicit directory.
pub async fn load_or_init(quill_dir: &Path) -> Result<QuillConfig, ConfigError> {
    let config_path = quill_dir.join(CONFIG_FILE_NAME);

    fs::create_dir_all(quill_dir).await?;

    if fs::try_exists(&config_path).await? {
        let mut file = fs::File::open(&config_path).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;

        let config: QuillConfig = serde_json::from_str(&contents)?;
        Ok(config)
    } else {
        let config = QuillConfig::new(quill_dir);

        let json = serde_json::to_string_pretty(&config)?;
        let mut file = fs::File::create(&config_path).await?;
        file.write_all(json.as_bytes()).await?;

        Ok(config)
    }
}
