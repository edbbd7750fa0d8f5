use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use tracing::{error, info, warn};

use tabhost::application::ports::task_queue::TaskHandler;
use tabhost::application::use_cases::worker::run_worker::{
    DEFAULT_CHANNELS, LogTaskHandler, RunWorker,
};
use tabhost::bootstrap::config::Config;
use tabhost::bootstrap::telemetry;
use tabhost::infrastructure::queue::redis_queue::RedisTaskQueue;
use tabhost::presentation::http::health::worker_routes;

const STARTUP_DELAY: Duration = Duration::from_secs(2);

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let cfg = Config::from_env()?;
    telemetry::init(telemetry::DEFAULT_FILTER, &cfg.error_reporting);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "worker_health_listening");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, worker_routes()).await {
            error!(error = ?e, "worker_health_server_failed");
        }
    });

    tokio::time::sleep(STARTUP_DELAY).await;

    let Some(redis) = cfg.redis.as_ref() else {
        warn!("worker_queue_not_configured; set REDIS_URL or REDIS_HOST/REDIS_PORT");
        shutdown_signal().await;
        return Ok(());
    };
    let queue = Arc::new(RedisTaskQueue::new(redis, cfg.worker_queue_prefix.clone())?);
    let handler: Arc<dyn TaskHandler> = Arc::new(LogTaskHandler);
    let mut worker = RunWorker::new(queue);
    for channel in DEFAULT_CHANNELS {
        worker = worker.route(channel, handler.clone());
    }
    info!(prefix = %cfg.worker_queue_prefix, "worker_queue_connected");
    worker.run_until(shutdown_signal()).await;
    Ok(())
}
