use std::time::Duration;

use async_trait::async_trait;

/// Best-effort cache. Backend failures surface as misses, never as errors.
#[async_trait]
pub trait CachePort: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str, ttl: Duration);
    async fn delete(&self, key: &str);
}
