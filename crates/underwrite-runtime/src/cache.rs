//! Caching layer for underwrite-runtime.
//!
//! Caches the deterministic part of an evaluation. Rollouts often repeat a
//! response verbatim; the assessment is reused and only the noise is drawn
//! again, so a cached response still gets a fresh tie-breaker.

use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use underwrite_core::{Assessment, Response};

use crate::config::CacheConfig;

/// Cache key: a hash of the response content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(u64);

impl CacheKey {
    pub fn new(response: &Response) -> Self {
        let mut hasher = DefaultHasher::new();
        match response {
            Response::Text(text) => {
                0u8.hash(&mut hasher);
                text.hash(&mut hasher);
            }
            Response::Structured(value) => {
                1u8.hash(&mut hasher);
                value.to_string().hash(&mut hasher);
            }
        }
        Self(hasher.finish())
    }
}

/// Assessment cache using moka.
pub struct EvaluationCache {
    cache: Cache<CacheKey, Arc<Assessment>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EvaluationCache {
    /// Create a new cache with the given configuration.
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl)
    }

    /// Get a cached assessment, counting the hit or miss.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<Assessment>> {
        let found = self.cache.get(key).await;
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store an assessment in the cache.
    pub async fn insert(&self, key: CacheKey, assessment: Arc<Assessment>) {
        self.cache.insert(key, assessment).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl Default for EvaluationCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use underwrite_core::ScoringEngine;

    #[tokio::test]
    async fn test_cache_operations() {
        let cache = EvaluationCache::default();
        let response = Response::text("{\"decision\": \"APPROVED\"}");
        let key = CacheKey::new(&response);

        // Cache miss
        assert!(cache.get(&key).await.is_none());

        // Insert
        let assessment = Arc::new(ScoringEngine::default().assess(&response));
        cache.insert(key, Arc::clone(&assessment)).await;

        // Cache hit
        let cached = cache.get(&key).await;
        assert_eq!(cached.as_deref(), Some(assessment.as_ref()));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_keys_follow_content() {
        let a = CacheKey::new(&Response::text("same"));
        let b = CacheKey::new(&Response::text("same"));
        let c = CacheKey::new(&Response::text("different"));
        let d = CacheKey::new(&Response::from(json!("same")));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }
}
