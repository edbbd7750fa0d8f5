use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use tokio::sync::OnceCell;

use crate::application::ports::cache_port::CachePort;
use crate::bootstrap::config::RedisSettings;

const KEY_PREFIX: &str = "tabhost:cache:";

/// Redis-backed cache. The connection is opened on first use and retried
/// on the next call if it fails, so an unreachable server only costs misses.
pub struct RedisCache {
    client: redis::Client,
    manager_config: ConnectionManagerConfig,
    manager: OnceCell<ConnectionManager>,
    ignore_errors: bool,
}

impl RedisCache {
    pub fn new(settings: &RedisSettings) -> anyhow::Result<Self> {
        let client = redis::Client::open(settings.location.expose())?;
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(settings.connect_timeout)
            .set_response_timeout(settings.socket_timeout)
            .set_number_of_retries(1);
        Ok(Self {
            client,
            manager_config,
            manager: OnceCell::new(),
            ignore_errors: settings.ignore_errors,
        })
    }

    async fn connection(&self) -> redis::RedisResult<ConnectionManager> {
        self.manager
            .get_or_try_init(|| {
                ConnectionManager::new_with_config(self.client.clone(), self.manager_config.clone())
            })
            .await
            .cloned()
    }

    fn report(&self, op: &'static str, key: &str, err: &redis::RedisError) {
        if self.ignore_errors {
            tracing::warn!(op, key, error = %err, "cache_unavailable");
        } else {
            tracing::error!(op, key, error = %err, "cache_unavailable");
        }
    }
}

fn namespaced(key: &str) -> String {
    format!("{KEY_PREFIX}{key}")
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CachePort for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let res = match self.connection().await {
            Ok(mut conn) => conn.get::<_, Option<String>>(namespaced(key)).await,
            Err(e) => Err(e),
        };
        res.unwrap_or_else(|e| {
            self.report("get", key, &e);
            None
        })
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) {
        let res = match self.connection().await {
            Ok(mut conn) => {
                conn.set_ex::<_, _, ()>(namespaced(key), value, ttl_secs(ttl))
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = res {
            self.report("set", key, &e);
        }
    }

    async fn delete(&self, key: &str) {
        let res = match self.connection().await {
            Ok(mut conn) => conn.del::<_, ()>(namespaced(key)).await,
            Err(e) => Err(e),
        };
        if let Err(e) = res {
            self.report("delete", key, &e);
        }
    }
}
