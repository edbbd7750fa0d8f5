use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct QueuedTask {
    pub channel: String,
    pub payload: String,
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Blocks up to `timeout` for the next task on any of `channels`.
    async fn pop(&self, channels: &[String], timeout: Duration) -> anyhow::Result<Option<QueuedTask>>;
}

/// Decoded queue message: `{"type": "...", ...}`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct TaskMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub body: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, channel: &str, message: &TaskMessage) -> anyhow::Result<()>;
}
