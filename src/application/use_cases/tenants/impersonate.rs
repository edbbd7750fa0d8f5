use crate::application::ports::tenant_repository::TenantRepository;
use crate::application::ports::user_repository::{UserRepository, UserRow};
use crate::application::use_cases::tenants::error::TenantAdminError;
use crate::application::validation::FieldErrors;
use crate::domain::tenants::tenant::Tenant;

#[derive(Debug, Clone)]
pub struct ImpersonationGrant {
    pub tenant: Tenant,
    pub owner: UserRow,
    pub impersonator_id: i64,
}

/// Checks the target tenant exists; the presentation layer turns the grant
/// into a signed token.
pub struct Impersonate<'a, T, U>
where
    T: TenantRepository + ?Sized,
    U: UserRepository + ?Sized,
{
    pub tenants: &'a T,
    pub users: &'a U,
}

impl<'a, T, U> Impersonate<'a, T, U>
where
    T: TenantRepository + ?Sized,
    U: UserRepository + ?Sized,
{
    pub async fn execute(
        &self,
        impersonator_id: i64,
        tenant_id: i64,
    ) -> Result<ImpersonationGrant, TenantAdminError> {
        let tenant = self
            .tenants
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| FieldErrors::single("tenant_id", "Tenant not found."))?;
        let owner = self
            .users
            .find_by_id(tenant.owner_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("owner {} of tenant {} missing", tenant.owner_id, tenant.id))?;
        tracing::warn!(
            impersonator_id,
            tenant_id,
            schema = %tenant.schema_name,
            owner_id = owner.id,
            "impersonation_granted"
        );
        Ok(ImpersonationGrant {
            tenant,
            owner,
            impersonator_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::MemoryStore;

    #[tokio::test]
    async fn grants_access_to_existing_tenant() {
        let store = MemoryStore::new();
        let admin = store.add_user("root", true);
        let owner = store.add_user("jane", false);
        let tenant = store.seed_tenant(owner.id, "jane", "jane.tabs.example.org");

        let grant = Impersonate {
            tenants: &store,
            users: &store,
        }
        .execute(admin.id, tenant.id)
        .await
        .unwrap();

        assert_eq!(grant.owner.id, owner.id);
        assert_eq!(grant.tenant.schema_name, "jane");
        assert_eq!(grant.impersonator_id, admin.id);
    }

    #[tokio::test]
    async fn unknown_tenant_is_a_field_error() {
        let store = MemoryStore::new();
        let res = Impersonate {
            tenants: &store,
            users: &store,
        }
        .execute(1, 42)
        .await;
        match res {
            Err(TenantAdminError::Validation(errors)) => {
                assert_eq!(errors.messages("tenant_id"), ["Tenant not found."]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
