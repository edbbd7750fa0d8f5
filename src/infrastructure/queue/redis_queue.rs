use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use redis::AsyncConnectionConfig;
use redis::aio::MultiplexedConnection;
use tokio::sync::Mutex;

use crate::application::ports::task_queue::{QueuedTask, TaskQueue};
use crate::bootstrap::config::RedisSettings;

/// Task lists live at `{prefix}:{channel}`. Producers `RPUSH` onto them and
/// the worker `BLPOP`s.
pub struct RedisTaskQueue {
    client: redis::Client,
    prefix: String,
    connect_timeout: Duration,
    conn: Mutex<Option<MultiplexedConnection>>,
}

impl RedisTaskQueue {
    pub fn new(settings: &RedisSettings, prefix: impl Into<String>) -> anyhow::Result<Self> {
        let client = redis::Client::open(settings.location.expose())
            .context("redis_client_open")?;
        Ok(Self {
            client,
            prefix: prefix.into(),
            connect_timeout: settings.connect_timeout,
            conn: Mutex::new(None),
        })
    }

    fn list_key(&self, channel: &str) -> String {
        format!("{}:{}", self.prefix, channel)
    }

    fn channel_of<'k>(&self, key: &'k str) -> &'k str {
        key.strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(key)
    }

    async fn connection(&self, response_timeout: Duration) -> anyhow::Result<MultiplexedConnection> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let config = AsyncConnectionConfig::new()
            .set_connection_timeout(self.connect_timeout)
            .set_response_timeout(response_timeout);
        let conn = self
            .client
            .get_multiplexed_async_connection_with_config(&config)
            .await
            .context("redis_get_async_connection")?;
        *guard = Some(conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    async fn pop(&self, channels: &[String], timeout: Duration) -> anyhow::Result<Option<QueuedTask>> {
        if channels.is_empty() {
            tokio::time::sleep(timeout).await;
            return Ok(None);
        }
        // The response must be allowed to outlast the server-side block.
        let mut conn = self.connection(timeout + Duration::from_secs(5)).await?;
        let keys: Vec<String> = channels.iter().map(|c| self.list_key(c)).collect();
        let popped: Option<(String, String)> = match redis::cmd("BLPOP")
            .arg(&keys)
            .arg(timeout.as_secs_f64())
            .query_async(&mut conn)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                // Force a fresh connection on the next poll.
                *self.conn.lock().await = None;
                return Err(e).context("redis_blpop");
            }
        };
        Ok(popped.map(|(key, payload)| QueuedTask {
            channel: self.channel_of(&key).to_string(),
            payload,
        }))
    }
}
