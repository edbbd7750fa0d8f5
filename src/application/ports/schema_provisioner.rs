use async_trait::async_trait;

use crate::domain::tenants::tenant::UsageStats;

/// Namespace-per-tenant isolation: one PostgreSQL schema per tenant.
#[async_trait]
pub trait SchemaProvisioner: Send + Sync {
    async fn create_schema(&self, schema_name: &str) -> anyhow::Result<()>;
    async fn measure_usage(&self, schema_name: &str) -> anyhow::Result<UsageStats>;
}
