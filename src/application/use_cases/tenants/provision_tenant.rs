use crate::application::ports::schema_provisioner::SchemaProvisioner;
use crate::application::ports::tenant_repository::{NewTenant, TenantRepository};
use crate::application::ports::user_repository::UserRow;
use crate::domain::tenants::naming::{
    full_domain, generate_schema_name, generate_subdomain, is_valid_schema_name, schema_candidate,
    subdomain_candidate,
};
use crate::domain::tenants::tenant::{Domain, Plan, Tenant, site_name_for};

/// Creates the tenant, its schema and its primary domain for a freshly
/// registered account.
pub struct ProvisionTenant<'a, T, S>
where
    T: TenantRepository + ?Sized,
    S: SchemaProvisioner + ?Sized,
{
    pub tenants: &'a T,
    pub schemas: &'a S,
    pub base_domain: &'a str,
}

#[derive(Debug, Clone)]
pub struct ProvisionedTenant {
    pub tenant: Tenant,
    pub domain: Domain,
}

impl<'a, T, S> ProvisionTenant<'a, T, S>
where
    T: TenantRepository + ?Sized,
    S: SchemaProvisioner + ?Sized,
{
    /// `Ok(None)` for superusers and for users that already own a tenant.
    pub async fn execute(&self, user: &UserRow) -> anyhow::Result<Option<ProvisionedTenant>> {
        if user.is_superuser {
            tracing::debug!(user_id = user.id, "skipping tenant provisioning for superuser");
            return Ok(None);
        }
        if self.tenants.find_by_owner(user.id).await?.is_some() {
            return Ok(None);
        }

        let schema_name = self.unique_schema_name(&user.username).await?;
        let domain = self.unique_domain(&user.username).await?;
        let name = site_name_for(&user.username);

        // The namespace must exist before any tenant row points at it.
        self.schemas.create_schema(&schema_name).await?;
        let (tenant, domain) = self
            .tenants
            .create_with_domain(
                NewTenant {
                    schema_name: &schema_name,
                    name: &name,
                    owner_id: user.id,
                    plan: Plan::Free,
                    is_active: true,
                },
                &domain,
            )
            .await?;

        tracing::info!(
            tenant_id = tenant.id,
            tenant = %tenant.name,
            schema = %tenant.schema_name,
            domain = %domain.domain,
            "tenant_provisioned"
        );
        Ok(Some(ProvisionedTenant { tenant, domain }))
    }

    async fn unique_schema_name(&self, username: &str) -> anyhow::Result<String> {
        let base = generate_schema_name(username);
        let mut attempt = 0;
        let mut candidate = base.clone();
        // Reserved namespaces such as `public` fall through to `public_1`.
        while !is_valid_schema_name(&candidate)
            || self.tenants.schema_name_exists(&candidate).await?
        {
            attempt += 1;
            candidate = schema_candidate(&base, attempt);
        }
        Ok(candidate)
    }

    async fn unique_domain(&self, username: &str) -> anyhow::Result<String> {
        let base = generate_subdomain(username);
        let mut attempt = 0;
        let mut candidate = full_domain(&base, self.base_domain);
        while self.tenants.domain_exists(&candidate).await? {
            attempt += 1;
            candidate = full_domain(&subdomain_candidate(&base, attempt), self.base_domain);
        }
        Ok(candidate)
    }
}
