//! # Caching Sources
//!
//! Decorators that put an in-memory LRU in front of a [`MetadataSource`] or
//! [`QuerySource`]. They implement the same traits as what they wrap, so the
//! loader and the engine are unaware of them.
//!
//! - Entries expire after the configured TTL, measured with an injected
//!   [`Clock`].
//! - `no_cache` skips the read path; the fresh answer still refreshes the
//!   cache.
//! - Failures are never cached.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::{
    Clock, FetchOptions, MetadataResponse, MetadataSource, QuerySource, RelatedResponse,
    SearchParams, SearchResponse,
};
use core_runtime::config::CacheConfig;
use lru::LruCache;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

struct Entry<V> {
    value: V,
    stored_at_millis: i64,
}

/// A TTL-bounded LRU shared by the decorators.
struct TtlCache<K: Hash + Eq, V: Clone> {
    entries: RwLock<LruCache<K, Entry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K: Hash + Eq, V: Clone> TtlCache<K, V> {
    fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            ttl: config.ttl,
            clock,
        }
    }

    async fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.unix_timestamp_millis();
        let ttl_millis = self.ttl.as_millis() as i64;
        let mut entries = self.entries.write().await;
        let expired = match entries.get(key) {
            Some(entry) if now.saturating_sub(entry.stored_at_millis) < ttl_millis => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    async fn put(&self, key: K, value: V) {
        let stored_at_millis = self.clock.unix_timestamp_millis();
        self.entries.write().await.put(
            key,
            Entry {
                value,
                stored_at_millis,
            },
        );
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// Caching decorator for [`MetadataSource`].
///
/// Metadata and playlists are cached per identifier. Related items are
/// always fetched upstream.
pub struct CachingMetadataSource<S> {
    inner: S,
    metadata: TtlCache<String, MetadataResponse>,
    playlists: TtlCache<String, Vec<Value>>,
}

impl<S: MetadataSource> CachingMetadataSource<S> {
    pub fn new(inner: S, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            metadata: TtlCache::new(config, clock.clone()),
            playlists: TtlCache::new(config, clock),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of cached metadata responses.
    pub async fn cached_metadata(&self) -> usize {
        self.metadata.len().await
    }

    pub async fn clear(&self) {
        self.metadata.clear().await;
        self.playlists.clear().await;
    }
}

#[async_trait]
impl<S: MetadataSource> MetadataSource for CachingMetadataSource<S> {
    async fn fetch_metadata(
        &self,
        identifier: &str,
        options: FetchOptions,
    ) -> Result<MetadataResponse> {
        let key = identifier.to_string();
        if !options.no_cache {
            if let Some(hit) = self.metadata.get(&key).await {
                debug!(identifier, "Metadata cache hit");
                return Ok(hit);
            }
        }
        let response = self.inner.fetch_metadata(identifier, options).await?;
        self.metadata.put(key, response.clone()).await;
        Ok(response)
    }

    async fn fetch_playlist(&self, identifier: &str, options: FetchOptions) -> Result<Vec<Value>> {
        let key = identifier.to_string();
        if !options.no_cache {
            if let Some(hit) = self.playlists.get(&key).await {
                debug!(identifier, "Playlist cache hit");
                return Ok(hit);
            }
        }
        let playlist = self.inner.fetch_playlist(identifier, options).await?;
        self.playlists.put(key, playlist.clone()).await;
        Ok(playlist)
    }

    async fn fetch_related(
        &self,
        identifier: &str,
        options: FetchOptions,
    ) -> Result<RelatedResponse> {
        self.inner.fetch_related(identifier, options).await
    }
}

/// Caching decorator for [`QuerySource`], keyed by the full parameter set.
pub struct CachingQuerySource<S> {
    inner: S,
    responses: TtlCache<Vec<(String, String)>, SearchResponse>,
}

impl<S: QuerySource> CachingQuerySource<S> {
    pub fn new(inner: S, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            responses: TtlCache::new(config, clock),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub async fn clear(&self) {
        self.responses.clear().await;
    }
}

#[async_trait]
impl<S: QuerySource> QuerySource for CachingQuerySource<S> {
    async fn search(&self, params: &SearchParams, options: FetchOptions) -> Result<SearchResponse> {
        let key = params.query_pairs();
        if !options.no_cache {
            if let Some(hit) = self.responses.get(&key).await {
                debug!(q = %params.q, page = params.page, "Search cache hit");
                return Ok(hit);
            }
        }
        let response = self.inner.search(params, options).await?;
        self.responses.put(key, response.clone()).await;
        Ok(response)
    }
}
