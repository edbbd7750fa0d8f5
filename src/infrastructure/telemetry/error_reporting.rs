//! Forwards warning and error events to a Sentry-compatible store endpoint.
//!
//! Events are queued on a bounded channel from inside the tracing layer and
//! posted by a background task, so logging never waits on the network. When
//! the channel is full the event is dropped.

use anyhow::Context as _;
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use url::Url;

const QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    pub store_url: String,
    pub public_key: String,
}

impl Dsn {
    /// `https://<key>@<host>[:port]/<project>` becomes
    /// `https://<host>[:port]/api/<project>/store/`.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let url = Url::parse(raw).context("SENTRY_DSN is not a valid URL")?;
        let key = url.username();
        if key.is_empty() {
            anyhow::bail!("SENTRY_DSN has no public key");
        }
        let host = url.host_str().context("SENTRY_DSN has no host")?;
        let project = url
            .path_segments()
            .and_then(|mut s| s.next_back())
            .filter(|p| !p.is_empty())
            .context("SENTRY_DSN has no project id")?;
        let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
        Ok(Self {
            store_url: format!("{}://{host}{port}/api/{project}/store/", url.scheme()),
            public_key: key.to_string(),
        })
    }

    fn auth_header(&self) -> String {
        format!(
            "Sentry sentry_version=7, sentry_client=tabhost/{}, sentry_key={}",
            env!("CARGO_PKG_VERSION"),
            self.public_key
        )
    }
}

#[derive(Debug, Clone)]
pub struct ReportContext {
    pub release: &'static str,
    pub environment: &'static str,
    /// Only events whose target starts with this are forwarded.
    pub target_prefix: &'static str,
}

pub struct ErrorReportingLayer {
    tx: mpsc::Sender<Value>,
    ctx: ReportContext,
}

impl ErrorReportingLayer {
    /// Spawns the delivery task on the current runtime.
    pub fn spawn(dsn: Dsn, ctx: ReportContext) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(deliver(dsn, rx));
        Self { tx, ctx }
    }

    #[cfg(test)]
    fn with_sender(tx: mpsc::Sender<Value>, ctx: ReportContext) -> Self {
        Self { tx, ctx }
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.insert(field, Value::from(format!("{value:?}")));
    }
}

impl FieldCollector {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

fn sentry_level(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "error",
        Level::WARN => "warning",
        Level::INFO => "info",
        _ => "debug",
    }
}

impl<S: Subscriber> Layer<S> for ErrorReportingLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() > Level::WARN || !meta.target().starts_with(self.ctx.target_prefix) {
            return;
        }
        let mut collector = FieldCollector::default();
        event.record(&mut collector);
        let payload = json!({
            "event_id": uuid::Uuid::new_v4().simple().to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "level": sentry_level(meta.level()),
            "logger": meta.target(),
            "platform": "other",
            "message": collector.message.unwrap_or_else(|| meta.name().to_string()),
            "release": self.ctx.release,
            "environment": self.ctx.environment,
            "extra": collector.fields,
        });
        let _ = self.tx.try_send(payload);
    }
}

async fn deliver(dsn: Dsn, mut rx: mpsc::Receiver<Value>) {
    let client = reqwest::Client::new();
    let auth = dsn.auth_header();
    while let Some(payload) = rx.recv().await {
        let res = client
            .post(&dsn.store_url)
            .header("X-Sentry-Auth", &auth)
            .json(&payload)
            .send()
            .await;
        if let Err(e) = res.and_then(|r| r.error_for_status()) {
            // Printed rather than logged to avoid feeding the layer.
            eprintln!("error report delivery failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::prelude::*;

    #[test]
    fn parses_dsn() {
        let dsn = Dsn::parse("https://abc123@o42.ingest.sentry.io/4500").unwrap();
        assert_eq!(dsn.store_url, "https://o42.ingest.sentry.io/api/4500/store/");
        assert_eq!(dsn.public_key, "abc123");
        assert!(dsn.auth_header().contains("sentry_key=abc123"));

        let dsn = Dsn::parse("http://k@localhost:9000/7").unwrap();
        assert_eq!(dsn.store_url, "http://localhost:9000/api/7/store/");

        assert!(Dsn::parse("https://o42.ingest.sentry.io/4500").is_err());
        assert!(Dsn::parse("https://k@o42.ingest.sentry.io/").is_err());
        assert!(Dsn::parse("nonsense").is_err());
    }

    #[test]
    fn forwards_only_warnings_and_errors_from_own_target() {
        let (tx, mut rx) = mpsc::channel(8);
        let layer = ErrorReportingLayer::with_sender(
            tx,
            ReportContext {
                release: "1.0.0",
                environment: "test",
                target_prefix: "tabhost",
            },
        );
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "tabhost::x", "ignored");
            tracing::error!(target: "hyper::proto", "ignored too");
            tracing::warn!(target: "tabhost::tenants", tenant_id = 7, "tenant_suspended");
        });

        let event = rx.try_recv().unwrap();
        assert_eq!(event["level"], "warning");
        assert_eq!(event["message"], "tenant_suspended");
        assert_eq!(event["extra"]["tenant_id"], 7);
        assert_eq!(event["environment"], "test");
        assert!(rx.try_recv().is_err());
    }
}
