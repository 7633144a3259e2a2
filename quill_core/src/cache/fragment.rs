use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use super::backend::{CacheBackend, CacheError};

/// Logical cache key: a fragment name plus the request parameters it varies
/// on, kept apart so a whole fragment can be invalidated at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentKey {
    name: String,
    vary_on: Vec<String>,
}

impl FragmentKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vary_on: Vec::new(),
        }
    }

    pub fn vary_on(mut self, value: impl ToString) -> Self {
        self.vary_on.push(value.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn storage_key(&self, generation: &str) -> String {
        let mut key = format!("fragment:{}:{}", self.name, generation);
        for part in &self.vary_on {
            key.push(':');
            key.push_str(part);
        }
        key
    }
}

/// Memoizes rendered fragments in a [`CacheBackend`].
///
/// Every stored key embeds the fragment's current generation token, so
/// rotating the token orphans all variants of that fragment at once; the
/// orphans age out through their own TTL. Tokens are kept out of the
/// backend so its eviction never drops them.
///
/// Backend failures are never returned. A failed read is a miss, a failed
/// write leaves the value uncached.
#[derive(Clone)]
pub struct FragmentCache {
    backend: Arc<dyn CacheBackend>,
    generations: Arc<Mutex<HashMap<String, String>>>,
}

impl FragmentCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the cached value for `key`, or runs `compute` and caches its
    /// output for `ttl`.
    ///
    /// Until the entry expires or is invalidated, writes to the underlying
    /// data are not reflected: the cached bytes are served as is.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &FragmentKey,
        ttl: Duration,
        compute: F,
    ) -> Result<Bytes, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
    {
        let storage_key = match self.generation(key.name()) {
            Ok(generation) => Some(key.storage_key(&generation)),
            Err(error) => {
                warn!(fragment = key.name(), %error, "cache unavailable, recomputing");
                None
            }
        };

        if let Some(storage_key) = &storage_key {
            match self.backend.get(storage_key).await {
                Ok(Some(value)) => {
                    debug!(key = %storage_key, "fragment cache hit");
                    return Ok(value);
                }
                Ok(None) => debug!(key = %storage_key, "fragment cache miss"),
                Err(error) => warn!(key = %storage_key, %error, "cache read failed, recomputing"),
            }
        }

        let value = compute().await?;

        if let Some(storage_key) = &storage_key {
            if let Err(error) = self.backend.set(storage_key, value.clone(), Some(ttl)).await {
                warn!(key = %storage_key, %error, "cache write failed");
            }
        }

        Ok(value)
    }

    /// Evicts exactly one key.
    pub async fn invalidate(&self, key: &FragmentKey) {
        let result = match self.generation(key.name()) {
            Ok(generation) => self
                .backend
                .touch(&key.storage_key(&generation), Duration::ZERO)
                .await
                .map(|_| ()),
            Err(error) => Err(error),
        };

        if let Err(error) = result {
            warn!(fragment = key.name(), %error, "cache invalidation failed");
        }
    }

    /// Evicts every variant of the fragment `name`.
    pub async fn invalidate_fragment(&self, name: &str) {
        match self.generations.lock() {
            Ok(mut generations) => {
                generations.insert(name.to_string(), new_generation());
                debug!(fragment = name, "fragment generation rotated");
            }
            Err(_) => warn!(fragment = name, "cache invalidation failed: generation lock poisoned"),
        }
    }

    /// Flushes the whole backend, not only fragments.
    pub async fn clear(&self) {
        if let Err(error) = self.backend.clear().await {
            warn!(%error, "cache clear failed");
        }
    }

    fn generation(&self, name: &str) -> Result<String, CacheError> {
        let mut generations = self
            .generations
            .lock()
            .map_err(|_| CacheError::Unavailable("generation lock poisoned".to_string()))?;

        Ok(generations
            .entry(name.to_string())
            .or_insert_with(new_generation)
            .clone())
    }
}

fn new_generation() -> String {
    Uuid::now_v7().simple().to_string()
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::cache::{DisabledCache, MemoryCache};

    const TTL: Duration = Duration::from_secs(60);

    fn memory_cache() -> FragmentCache {
        FragmentCache::new(Arc::new(MemoryCache::new(64)))
    }

    async fn render(
        cache: &FragmentCache,
        key: &FragmentKey,
        calls: &AtomicUsize,
        body: &'static str,
    ) -> Bytes {
        cache
            .get_or_compute(key, TTL, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(Bytes::from_static(body.as_bytes()))
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_hit_skips_compute() {
        let cache = memory_cache();
        let key = FragmentKey::new("index_page").vary_on(1);
        let calls = AtomicUsize::new(0);

        let first = render(&cache, &key, &calls, "one").await;
        let second = render(&cache, &key, &calls, "two").await;

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_variants_are_cached_separately() {
        let cache = memory_cache();
        let calls = AtomicUsize::new(0);

        let page1 = render(&cache, &FragmentKey::new("index_page").vary_on(1), &calls, "p1").await;
        let page2 = render(&cache, &FragmentKey::new("index_page").vary_on(2), &calls, "p2").await;

        assert_ne!(page1, page2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let cache = memory_cache();
        let key = FragmentKey::new("index_page").vary_on(1);
        let calls = AtomicUsize::new(0);

        render(&cache, &key, &calls, "old").await;
        cache.invalidate(&key).await;
        let fresh = render(&cache, &key, &calls, "new").await;

        assert_eq!(fresh, Bytes::from_static(b"new"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_fragment_drops_all_variants() {
        let cache = memory_cache();
        let page1 = FragmentKey::new("index_page").vary_on(1);
        let page2 = FragmentKey::new("index_page").vary_on(2);
        let other = FragmentKey::new("sidebar");
        let calls = AtomicUsize::new(0);

        render(&cache, &page1, &calls, "a").await;
        render(&cache, &page2, &calls, "b").await;
        render(&cache, &other, &calls, "c").await;

        cache.invalidate_fragment("index_page").await;

        assert_eq!(render(&cache, &page1, &calls, "a2").await, Bytes::from_static(b"a2"));
        assert_eq!(render(&cache, &page2, &calls, "b2").await, Bytes::from_static(b"b2"));
        assert_eq!(render(&cache, &other, &calls, "c2").await, Bytes::from_static(b"c"));
    }

    #[tokio::test]
    async fn test_single_slot_backend_still_hits() {
        let cache = FragmentCache::new(Arc::new(MemoryCache::new(1)));
        let key = FragmentKey::new("index_page").vary_on(1);
        let calls = AtomicUsize::new(0);

        let before = render(&cache, &key, &calls, "before").await;
        let after = render(&cache, &key, &calls, "after-write").await;

        assert_eq!(before, after);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate_fragment("index_page").await;
        assert_eq!(
            render(&cache, &key, &calls, "fresh").await,
            Bytes::from_static(b"fresh")
        );
    }

    #[tokio::test]
    async fn test_expiry_forces_recompute() {
        let cache = memory_cache();
        let key = FragmentKey::new("index_page");
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_compute(&key, Duration::from_millis(20), || async {
                Ok::<_, Infallible>(Bytes::from_static(b"first"))
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = render(&cache, &key, &calls, "second").await;

        assert_eq!(first, Bytes::from_static(b"first"));
        assert_eq!(second, Bytes::from_static(b"second"));
    }

    #[tokio::test]
    async fn test_disabled_backend_always_computes() {
        let cache = FragmentCache::new(Arc::new(DisabledCache));
        let key = FragmentKey::new("index_page");
        let calls = AtomicUsize::new(0);

        let first = render(&cache, &key, &calls, "one").await;
        let second = render(&cache, &key, &calls, "two").await;
        cache.invalidate(&key).await;

        assert_eq!(first, Bytes::from_static(b"one"));
        assert_eq!(second, Bytes::from_static(b"two"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    /// Reads work, writes fail.
    struct ReadOnlyBackend(MemoryCache);

    #[async_trait]
    impl CacheBackend for ReadOnlyBackend {
        async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
            self.0.get(key).await
        }

        async fn set(&self, _: &str, _: Bytes, _: Option<Duration>) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("read only".to_string()))
        }

        async fn touch(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
            self.0.touch(key, ttl).await
        }

        async fn clear(&self) -> Result<(), CacheError> {
            self.0.clear().await
        }
    }

    #[tokio::test]
    async fn test_failed_write_is_not_an_error() {
        let cache = FragmentCache::new(Arc::new(ReadOnlyBackend(MemoryCache::new(8))));
        let key = FragmentKey::new("index_page");
        let calls = AtomicUsize::new(0);

        assert_eq!(render(&cache, &key, &calls, "x").await, Bytes::from_static(b"x"));
        assert_eq!(render(&cache, &key, &calls, "y").await, Bytes::from_static(b"y"));
    }

    #[tokio::test]
    async fn test_compute_error_propagates_and_is_not_cached() {
        let cache = memory_cache();
        let key = FragmentKey::new("index_page");

        let result = cache
            .get_or_compute(&key, TTL, || async { Err::<Bytes, _>("boom") })
            .await;
        assert_eq!(result, Err("boom"));

        let calls = AtomicUsize::new(0);
        render(&cache, &key, &calls, "ok").await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
