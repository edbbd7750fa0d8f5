use crate::application::dto::tenants::TenantDetailDto;
use crate::application::ports::tenant_repository::TenantRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::application::use_cases::tenants::error::TenantAdminError;

pub struct GetTenant<'a, T, U>
where
    T: TenantRepository + ?Sized,
    U: UserRepository + ?Sized,
{
    pub tenants: &'a T,
    pub users: &'a U,
}

impl<'a, T, U> GetTenant<'a, T, U>
where
    T: TenantRepository + ?Sized,
    U: UserRepository + ?Sized,
{
    pub async fn execute(&self, id: i64) -> Result<TenantDetailDto, TenantAdminError> {
        let tenant = self
            .tenants
            .find_by_id(id)
            .await?
            .ok_or(TenantAdminError::NotFound)?;
        let owner = self
            .users
            .find_by_id(tenant.owner_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("owner {} of tenant {} missing", tenant.owner_id, id))?;
        let mut domains = self.tenants.list_domains(id).await?;
        domains.sort_by(|a, b| a.domain.cmp(&b.domain));
        Ok(TenantDetailDto {
            tenant,
            owner,
            domains,
        })
    }
}
