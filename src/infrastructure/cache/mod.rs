use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::cache_port::CachePort;

pub mod redis_cache;

/// Used when no cache backend is configured. Every lookup misses.
pub struct NoopCache;

#[async_trait]
impl CachePort for NoopCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) {}

    async fn delete(&self, _key: &str) {}
}
