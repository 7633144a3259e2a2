use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Minimal key/value protocol with per-entry expiry.
///
/// Implementations must be safe to share between tasks. `ttl: None` stores
/// without expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Resets the expiry of a live entry. A zero `ttl` expires it now.
    /// Returns whether the key was present.
    async fn touch(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;

    /// Drops every entry.
    async fn clear(&self) -> Result<(), CacheError>;
}

/// A backend that is never reachable, so every read recomputes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCache;

#[async_trait]
impl CacheBackend for DisabledCache {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        Err(CacheError::Unavailable("cache disabled".to_string()))
    }

    async fn set(&self, _key: &str, _value: Bytes, _ttl: Option<Duration>) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("cache disabled".to_string()))
    }

    async fn touch(&self, _key: &str, _ttl: Duration) -> Result<bool, CacheError> {
        Err(CacheError::Unavailable("cache disabled".to_string()))
    }

    async fn clear(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
