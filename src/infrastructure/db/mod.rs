use std::str::FromStr;

use anyhow::Context;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};

use crate::bootstrap::config::DatabaseSettings;
use crate::infrastructure::net::resolve_ipv4;

pub type PgPool = Pool<Postgres>;

/// Builds connect options from the settings. With `force_ipv4` the host is
/// replaced by an IPv4 literal for this pool only; TLS and the original
/// host name in the URL are otherwise left as configured.
pub async fn connect_options(settings: &DatabaseSettings) -> anyhow::Result<PgConnectOptions> {
    let mut options = PgConnectOptions::from_str(settings.url.expose())
        .context("DATABASE_URL is not a valid postgres URL")?;
    if settings.force_ipv4 {
        let host = options.get_host().to_string();
        let addr = resolve_ipv4(&host, options.get_port()).await?;
        tracing::info!(%host, ip = %addr, "database_host_pinned_ipv4");
        options = options.host(&addr.to_string());
    }
    Ok(options)
}

pub async fn connect_pool(settings: &DatabaseSettings) -> anyhow::Result<PgPool> {
    let options = connect_options(settings).await?;
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .idle_timeout(Some(settings.conn_max_age))
        .connect_with(options)
        .await
        .context("database_connect")?;
    Ok(pool)
}

pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    // Uses compile-time embedded migrations under ./migrations
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub mod repositories;
pub mod schema_provisioner_pg;
