use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::task_queue::{QueuedTask, TaskHandler, TaskMessage, TaskQueue};

pub const DEFAULT_CHANNELS: [&str; 3] = ["notifications", "adjallocation", "venues"];

const POLL_TIMEOUT: Duration = Duration::from_secs(5);
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    Failed,
    Undecodable,
    Unrouted,
}

/// Consumes queued tasks and dispatches each by channel.
pub struct RunWorker {
    queue: Arc<dyn TaskQueue>,
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
    channels: Vec<String>,
    poll_timeout: Duration,
}

impl RunWorker {
    pub fn new(queue: Arc<dyn TaskQueue>) -> Self {
        Self {
            queue,
            handlers: HashMap::new(),
            channels: Vec::new(),
            poll_timeout: POLL_TIMEOUT,
        }
    }

    pub fn route(mut self, channel: &str, handler: Arc<dyn TaskHandler>) -> Self {
        if !self.channels.iter().any(|c| c == channel) {
            self.channels.push(channel.to_string());
        }
        self.handlers.insert(channel.to_string(), handler);
        self
    }

    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Runs until `shutdown` resolves. Shutdown is only acted on between
    /// polls: a pop already in flight is awaited and its task dispatched, since
    /// the broker may have removed it from the list already. Queue errors are
    /// logged and retried.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut stopping = false;
        tracing::info!(channels = ?self.channels, "worker_started");
        while !stopping {
            let pop = self.queue.pop(&self.channels, self.poll_timeout);
            tokio::pin!(pop);
            let popped = loop {
                tokio::select! {
                    popped = &mut pop => break popped,
                    _ = &mut shutdown, if !stopping => stopping = true,
                }
            };
            match popped {
                Ok(Some(task)) => {
                    self.dispatch(&task).await;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = ?e, "worker_queue_pop_failed");
                    if !stopping {
                        tokio::time::sleep(ERROR_BACKOFF).await;
                    }
                }
            }
        }
        tracing::info!("worker_stopped");
    }

    pub async fn dispatch(&self, task: &QueuedTask) -> Outcome {
        let message: TaskMessage = match serde_json::from_str(&task.payload) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(channel = %task.channel, error = %e, "worker_message_undecodable");
                return Outcome::Undecodable;
            }
        };
        let Some(handler) = self.handlers.get(&task.channel) else {
            tracing::warn!(channel = %task.channel, kind = %message.kind, "worker_message_unrouted");
            return Outcome::Unrouted;
        };
        match handler.handle(&task.channel, &message).await {
            Ok(()) => Outcome::Handled,
            Err(e) => {
                tracing::error!(
                    channel = %task.channel,
                    kind = %message.kind,
                    error = ?e,
                    "worker_task_failed"
                );
                Outcome::Failed
            }
        }
    }
}

/// Records every task it receives in the log.
pub struct LogTaskHandler;

#[async_trait]
impl TaskHandler for LogTaskHandler {
    async fn handle(&self, channel: &str, message: &TaskMessage) -> anyhow::Result<()> {
        tracing::info!(
            channel,
            kind = %message.kind,
            fields = message.body.len(),
            "worker_task_received"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedQueue {
        tasks: Mutex<VecDeque<QueuedTask>>,
    }

    #[async_trait]
    impl TaskQueue for ScriptedQueue {
        async fn pop(
            &self,
            channels: &[String],
            timeout: Duration,
        ) -> anyhow::Result<Option<QueuedTask>> {
            let next = {
                let mut tasks = self.tasks.lock().unwrap();
                let pos = tasks.iter().position(|t| channels.contains(&t.channel));
                pos.and_then(|i| tasks.remove(i))
            };
            if next.is_none() {
                tokio::time::sleep(timeout).await;
            }
            Ok(next)
        }
    }

    /// Hands out one task only after `delay`, like a BLPOP that is answered
    /// late.
    struct SlowQueue {
        delay: Duration,
        task: Mutex<Option<QueuedTask>>,
    }

    #[async_trait]
    impl TaskQueue for SlowQueue {
        async fn pop(
            &self,
            _channels: &[String],
            _timeout: Duration,
        ) -> anyhow::Result<Option<QueuedTask>> {
            tokio::time::sleep(self.delay).await;
            Ok(self.task.lock().unwrap().take())
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl TaskHandler for Recorder {
        async fn handle(&self, channel: &str, message: &TaskMessage) -> anyhow::Result<()> {
            if message.kind == "explode" {
                anyhow::bail!("boom");
            }
            self.seen
                .lock()
                .unwrap()
                .push((channel.to_string(), message.kind.clone()));
            Ok(())
        }
    }

    fn task(channel: &str, payload: &str) -> QueuedTask {
        QueuedTask {
            channel: channel.into(),
            payload: payload.into(),
        }
    }

    #[tokio::test]
    async fn dispatches_by_channel() {
        let recorder = Arc::new(Recorder::default());
        let worker = RunWorker::new(Arc::new(ScriptedQueue::default()))
            .route("notifications", recorder.clone())
            .route("venues", recorder.clone());

        assert_eq!(
            worker
                .dispatch(&task("notifications", r#"{"type":"email","to":"x"}"#))
                .await,
            Outcome::Handled
        );
        assert_eq!(
            worker.dispatch(&task("draw", r#"{"type":"generate"}"#)).await,
            Outcome::Unrouted
        );
        assert_eq!(
            worker.dispatch(&task("venues", "not json")).await,
            Outcome::Undecodable
        );
        assert_eq!(
            worker.dispatch(&task("venues", r#"{"type":"explode"}"#)).await,
            Outcome::Failed
        );
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![("notifications".to_string(), "email".to_string())]
        );
    }

    #[tokio::test]
    async fn drains_queue_until_shutdown() {
        let queue = Arc::new(ScriptedQueue::default());
        {
            let mut tasks = queue.tasks.lock().unwrap();
            tasks.push_back(task("notifications", r#"{"type":"a"}"#));
            tasks.push_back(task("adjallocation", r#"{"type":"b"}"#));
        }
        let recorder = Arc::new(Recorder::default());
        let mut worker = RunWorker::new(queue.clone()).poll_timeout(Duration::from_millis(5));
        for channel in DEFAULT_CHANNELS {
            worker = worker.route(channel, recorder.clone());
        }
        assert_eq!(worker.channels().len(), 3);

        worker
            .run_until(tokio::time::sleep(Duration::from_millis(50)))
            .await;

        assert_eq!(recorder.seen.lock().unwrap().len(), 2);
        assert!(queue.tasks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn shutdown_waits_for_the_pop_in_flight() {
        let queue = Arc::new(SlowQueue {
            delay: Duration::from_millis(60),
            task: Mutex::new(Some(task("notifications", r#"{"type":"late"}"#))),
        });
        let recorder = Arc::new(Recorder::default());
        let worker = RunWorker::new(queue.clone()).route("notifications", recorder.clone());

        worker
            .run_until(tokio::time::sleep(Duration::from_millis(5)))
            .await;

        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![("notifications".to_string(), "late".to_string())]
        );
        assert!(queue.task.lock().unwrap().is_none());
    }
}
