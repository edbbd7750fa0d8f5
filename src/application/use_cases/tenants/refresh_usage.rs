use crate::application::ports::schema_provisioner::SchemaProvisioner;
use crate::application::ports::tenant_repository::TenantRepository;
use crate::application::use_cases::tenants::error::TenantAdminError;
use crate::domain::tenants::tenant::{Tenant, TenantLimits};

/// Recomputes the usage counters from the tenant's own schema and flags
/// tenants that went over their quotas.
pub struct RefreshUsage<'a, T, S>
where
    T: TenantRepository + ?Sized,
    S: SchemaProvisioner + ?Sized,
{
    pub tenants: &'a T,
    pub schemas: &'a S,
    pub limits: &'a TenantLimits,
}

impl<'a, T, S> RefreshUsage<'a, T, S>
where
    T: TenantRepository + ?Sized,
    S: SchemaProvisioner + ?Sized,
{
    pub async fn execute(&self, id: i64) -> Result<Tenant, TenantAdminError> {
        let tenant = self
            .tenants
            .find_by_id(id)
            .await?
            .ok_or(TenantAdminError::NotFound)?;
        let usage = self.schemas.measure_usage(&tenant.schema_name).await?;
        let updated = self
            .tenants
            .record_usage(id, &usage)
            .await?
            .ok_or(TenantAdminError::NotFound)?;
        tracing::debug!(
            tenant_id = id,
            storage_mb = usage.storage_used_mb,
            users = usage.total_users,
            tournaments = usage.total_tournaments,
            "tenant_usage_refreshed"
        );
        let over = self.limits.exceeded_by(&usage);
        if !over.is_empty() {
            tracing::warn!(
                tenant_id = id,
                schema = %tenant.schema_name,
                exceeded = ?over,
                "tenant_over_limit"
            );
        }
        Ok(updated)
    }
}
