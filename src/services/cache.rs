use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::{query_params, FilterState, Language};

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Per-query result cache
///
/// L1 is an in-process moka cache. L2 (Redis) is optional and shared across
/// instances. Entries are only ever looked up by their exact key, so a changed
/// filter, page or language can never be served a stale page.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a cache manager, connecting to Redis when a URL is given
    pub async fn new(redis_url: Option<&str>, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let redis = match redis_url {
            Some(url) => {
                let client = redis::Client::open(url)?;
                let manager = redis::aio::ConnectionManager::new(client).await?;
                Some(Arc::new(tokio::sync::Mutex::new(manager)))
            }
            None => None,
        };

        Ok(Self::build(redis, l1_size, ttl_secs))
    }

    /// In-process cache only
    pub fn in_memory(l1_size: u64, ttl_secs: u64) -> Self {
        Self::build(None, l1_size, ttl_secs)
    }

    fn build(
        redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
        l1_size: u64,
        ttl_secs: u64,
    ) -> Self {
        let l1_cache = moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs.max(1)))
            .build();

        Self {
            redis,
            l1_cache,
            ttl_secs,
        }
    }

    /// A zero TTL turns caching off
    pub fn is_enabled(&self) -> bool {
        self.ttl_secs > 0
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if !self.is_enabled() {
            return Err(CacheError::CacheMiss(key.to_string()));
        }

        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let value: Option<String> = redis::cmd("GET")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
            drop(conn);

            if let Some(json) = value {
                tracing::trace!("L2 cache hit: {}", key);
                self.l1_cache
                    .insert(key.to_string(), json.as_bytes().to_vec())
                    .await;
                return Ok(serde_json::from_str(&json)?);
            }
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in cache (both tiers)
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        if !self.is_enabled() {
            return Ok(());
        }

        let json = serde_json::to_string(value)?;
        self.l1_cache
            .insert(key.to_string(), json.as_bytes().to_vec())
            .await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async::<()>(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from both cache tiers
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;
        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("DEL")
                .arg(key)
                .query_async::<()>(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_size: self.l1_cache.entry_count(),
            l2_enabled: self.redis.is_some(),
            ttl_secs: self.ttl_secs,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1_size: u64,
    pub l2_enabled: bool,
    pub ttl_secs: u64,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Key for one result page: `(filters, page, page size, backend flag, language)`
    pub fn search(filters: &FilterState, page: u32, page_size: usize, backend: bool, language: Language) -> String {
        format!(
            "search:{}:{}:{}:{}:{}:{}",
            language.as_str(),
            if backend { "backend" } else { "local" },
            page,
            page_size,
            // the URL encoding leaves out the residential flag
            if filters.exclude_residential { "xr" } else { "all" },
            query_params::encode(filters, 1)
        )
    }

    /// Key for the architect list of one building
    pub fn architects(building_id: i64, language: Language) -> String {
        format!("architects:{}:{}", building_id, language.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_cache_set_get_with_redis() {
        let cache = CacheManager::new(Some("redis://127.0.0.1:6379"), 1000, 60)
            .await
            .expect("Failed to create cache");

        cache.set("test_key", &"test_value").await.unwrap();
        let result: String = cache.get("test_key").await.unwrap();
        assert_eq!(result, "test_value");

        cache.delete("test_key").await.unwrap();
        assert!(cache.get::<String>("test_key").await.is_err());
    }

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let cache = CacheManager::in_memory(100, 60);
        cache.set("k", &vec![1, 2, 3]).await.unwrap();
        let value: Vec<i32> = cache.get("k").await.unwrap();
        assert_eq!(value, vec![1, 2, 3]);
        assert!(matches!(cache.get::<Vec<i32>>("other").await, Err(CacheError::CacheMiss(_))));
    }

    #[tokio::test]
    async fn test_stats_report_l1_entries() {
        let cache = CacheManager::in_memory(100, 60);
        cache.set("a", &1).await.unwrap();
        cache.set("b", &2).await.unwrap();
        cache.l1_cache.run_pending_tasks().await;

        let stats = cache.stats();
        assert_eq!(stats.l1_size, 2);
        assert!(!stats.l2_enabled);
        assert_eq!(stats.ttl_secs, 60);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let cache = CacheManager::in_memory(100, 0);
        cache.set("k", &1).await.unwrap();
        assert!(cache.get::<i32>("k").await.is_err());
    }

    #[test]
    fn test_search_key_varies_with_every_component() {
        let filters = FilterState::default();
        let base = CacheKey::search(&filters, 1, 20, true, Language::Ja);

        assert_ne!(base, CacheKey::search(&filters, 2, 20, true, Language::Ja));
        assert_ne!(base, CacheKey::search(&filters, 1, 10, true, Language::Ja));
        assert_ne!(base, CacheKey::search(&filters, 1, 20, false, Language::Ja));
        assert_ne!(base, CacheKey::search(&filters, 1, 20, true, Language::En));

        let mut residential = filters.clone();
        residential.exclude_residential = false;
        assert_ne!(base, CacheKey::search(&residential, 1, 20, true, Language::Ja));

        let mut typed = filters.clone();
        typed.building_types.insert("美術館".into());
        assert_ne!(base, CacheKey::search(&typed, 1, 20, true, Language::Ja));
    }
}
