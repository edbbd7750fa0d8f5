use crate::application::ports::cache_port::CachePort;
use crate::application::ports::tenant_repository::TenantRepository;
use crate::application::use_cases::tenants::error::TenantAdminError;
use crate::application::use_cases::tenants::resolve_tenant::host_cache_key;
use crate::application::validation::FieldErrors;
use crate::domain::tenants::tenant::Tenant;

#[derive(Debug, Clone)]
pub struct SuspendTenantRequest {
    pub suspend: bool,
    pub reason: Option<String>,
}

impl SuspendTenantRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let has_reason = self
            .reason
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty());
        if self.suspend && !has_reason {
            return Err(FieldErrors::single(
                "reason",
                "Reason is required when suspending a tenant.",
            ));
        }
        Ok(())
    }
}

pub struct SuspendTenant<'a, T, C>
where
    T: TenantRepository + ?Sized,
    C: CachePort + ?Sized,
{
    pub tenants: &'a T,
    pub cache: &'a C,
}

impl<'a, T, C> SuspendTenant<'a, T, C>
where
    T: TenantRepository + ?Sized,
    C: CachePort + ?Sized,
{
    pub async fn execute(
        &self,
        id: i64,
        req: &SuspendTenantRequest,
    ) -> Result<Tenant, TenantAdminError> {
        req.validate()?;
        let tenant = self
            .tenants
            .set_suspended(id, req.suspend)
            .await?
            .ok_or(TenantAdminError::NotFound)?;

        for domain in self.tenants.list_domains(id).await? {
            self.cache.delete(&host_cache_key(&domain.domain)).await;
        }

        if req.suspend {
            tracing::warn!(
                tenant_id = id,
                schema = %tenant.schema_name,
                reason = req.reason.as_deref().unwrap_or_default(),
                "tenant_suspended"
            );
        } else {
            tracing::info!(tenant_id = id, schema = %tenant.schema_name, "tenant_unsuspended");
        }
        Ok(tenant)
    }
}
