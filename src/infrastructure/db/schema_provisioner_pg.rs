use anyhow::Context;
use async_trait::async_trait;

use crate::application::ports::schema_provisioner::SchemaProvisioner;
use crate::domain::tenants::naming::is_valid_schema_name;
use crate::domain::tenants::tenant::UsageStats;
use crate::infrastructure::db::PgPool;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Creates and measures per-tenant PostgreSQL schemas.
pub struct PgSchemaProvisioner {
    pub pool: PgPool,
}

impl PgSchemaProvisioner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count_if_present(&self, schema_name: &str, table: &str) -> anyhow::Result<i32> {
        let qualified = format!("{}.{}", quote_ident(schema_name)?, quote_ident(table)?);
        let exists: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
            .bind(&qualified)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Ok(0);
        }
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {qualified}"))
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("count {qualified}"))?;
        Ok(i32::try_from(n).unwrap_or(i32::MAX))
    }
}

/// Quotes a schema or table identifier after checking it against the
/// naming rules, so it can be interpolated into DDL.
pub fn quote_ident(name: &str) -> anyhow::Result<String> {
    if !is_valid_schema_name(name) {
        anyhow::bail!("invalid schema identifier `{name}`");
    }
    Ok(format!("\"{name}\""))
}

#[async_trait]
impl SchemaProvisioner for PgSchemaProvisioner {
    async fn create_schema(&self, schema_name: &str) -> anyhow::Result<()> {
        // No IF NOT EXISTS: a namespace that is already there belongs to
        // someone else and must not be adopted.
        let sql = format!("CREATE SCHEMA {}", quote_ident(schema_name)?);
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .with_context(|| format!("create schema {schema_name}"))?;
        tracing::info!(schema = schema_name, "tenant_schema_created");
        Ok(())
    }

    async fn measure_usage(&self, schema_name: &str) -> anyhow::Result<UsageStats> {
        let bytes: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(pg_total_relation_size(c.oid)), 0)::BIGINT
             FROM pg_class c
             JOIN pg_namespace n ON n.oid = c.relnamespace
             WHERE n.nspname = $1 AND c.relkind IN ('r', 'm', 'p')",
        )
        .bind(schema_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(UsageStats {
            storage_used_mb: bytes as f64 / BYTES_PER_MB,
            total_users: self.count_if_present(schema_name, "users").await?,
            total_tournaments: self.count_if_present(schema_name, "tournaments").await?,
        })
    }
}
