use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::bootstrap::config::ErrorReportingSettings;
use crate::infrastructure::telemetry::error_reporting::{Dsn, ErrorReportingLayer, ReportContext};

pub const DEFAULT_FILTER: &str = "tabhost=debug,axum=info,tower_http=info,sqlx=warn";

/// Installs the global subscriber. `RUST_LOG` overrides `default_filter`.
/// Must run inside a tokio runtime when error reporting is enabled.
pub fn init(default_filter: &str, reporting: &ErrorReportingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let mut dsn_error = None;
    let reporter = match reporting.dsn.as_ref().filter(|_| reporting.enabled()) {
        Some(raw) => match Dsn::parse(raw.expose()) {
            Ok(dsn) => Some(ErrorReportingLayer::spawn(
                dsn,
                ReportContext {
                    release: reporting.release,
                    environment: reporting.environment,
                    target_prefix: "tabhost",
                },
            )),
            Err(e) => {
                dsn_error = Some(e);
                None
            }
        },
        None => None,
    };
    let reporting_on = reporter.is_some();

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(reporter)
        .init();

    if let Some(e) = dsn_error {
        tracing::warn!(error = %e, "error_reporting_disabled_invalid_dsn");
    } else {
        tracing::debug!(enabled = reporting_on, "error_reporting_configured");
    }
}
