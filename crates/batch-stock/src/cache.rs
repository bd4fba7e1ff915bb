//! Caching layer for fetched market data and AI output

use cached::{Cached, TimedCache};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cache key for a data request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Market symbol
    pub symbol: String,
    /// Data kind (quote, history, news, ...)
    pub endpoint: String,
    /// Additional parameters as JSON string
    pub params: String,
}

impl CacheKey {
    pub fn new(symbol: impl Into<String>, endpoint: impl Into<String>, params: impl Serialize) -> Self {
        Self {
            symbol: symbol.into(),
            endpoint: endpoint.into(),
            params: serde_json::to_string(&params).unwrap_or_default(),
        }
    }
}

/// How a single request treats the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Read and write the cache at all
    pub use_cache: bool,
    /// Skip the read, fetch fresh data and overwrite the entry
    pub force_refresh: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            use_cache: true,
            force_refresh: false,
        }
    }
}

/// Thread-safe cache of JSON values with a fixed lifespan
#[derive(Clone)]
pub struct StockCache {
    cache: Arc<RwLock<TimedCache<CacheKey, Value>>>,
}

impl StockCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        let mut cache = self.cache.write().await;
        cache.cache_get(key).cloned()
    }

    pub async fn insert(&self, key: CacheKey, value: Value) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key, value);
    }

    /// Get or fetch a value according to `policy`
    ///
    /// - `use_cache = false`: always fetch, the cache is neither read nor written
    /// - `force_refresh = true`: always fetch, the result replaces the cached entry
    /// - otherwise: return a live entry or fetch and store
    pub async fn fetch_with<F, Fut, E>(
        &self,
        key: CacheKey,
        policy: CachePolicy,
        fetcher: F,
    ) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Value, E>>,
    {
        if !policy.use_cache {
            return fetcher().await;
        }

        if !policy.force_refresh {
            if let Some(value) = self.get(&key).await {
                tracing::debug!("Cache hit for key: {:?}", key);
                return Ok(value);
            }
            tracing::debug!("Cache miss for key: {:?}", key);
        }

        let value = fetcher().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_remove(key);
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }

    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// One cache per data kind, each with its own lifespan
#[derive(Clone)]
pub struct CacheManager {
    /// Latest quotes
    pub quotes: StockCache,
    /// Daily bar history
    pub history: StockCache,
    /// Company news
    pub news: StockCache,
    /// LLM output
    pub analysis: StockCache,
}

impl CacheManager {
    pub fn new(quote_ttl: Duration, history_ttl: Duration, news_ttl: Duration, analysis_ttl: Duration) -> Self {
        Self {
            quotes: StockCache::new(quote_ttl),
            history: StockCache::new(history_ttl),
            news: StockCache::new(news_ttl),
            analysis: StockCache::new(analysis_ttl),
        }
    }

    pub fn default_config() -> Self {
        Self::new(
            Duration::from_secs(60),       // quotes
            Duration::from_secs(3600),     // daily bars
            Duration::from_secs(1800),     // news
            Duration::from_secs(6 * 3600), // AI reports
        )
    }

    pub async fn clear_all(&self) {
        self.quotes.clear().await;
        self.history.clear().await;
        self.news.clear().await;
        self.analysis.clear().await;
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::default_config()
    }
}
