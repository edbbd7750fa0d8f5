use crate::application::ports::tenant_repository::{TenantPatch, TenantRepository};
use crate::application::use_cases::tenants::create_tenant::{parse_plan, validate_name};
use crate::application::use_cases::tenants::error::TenantAdminError;
use crate::application::validation::FieldErrors;
use crate::domain::tenants::tenant::Tenant;

#[derive(Debug, Clone, Default)]
pub struct UpdateTenantRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub plan: Option<String>,
    pub notes: Option<String>,
}

pub struct UpdateTenant<'a, T: TenantRepository + ?Sized> {
    pub tenants: &'a T,
}

impl<'a, T: TenantRepository + ?Sized> UpdateTenant<'a, T> {
    pub async fn execute(
        &self,
        id: i64,
        req: &UpdateTenantRequest,
    ) -> Result<Tenant, TenantAdminError> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &req.name {
            validate_name(name, &mut errors);
        }
        let plan = req
            .plan
            .as_deref()
            .and_then(|raw| parse_plan(raw, &mut errors));
        errors.into_result()?;

        let patch = TenantPatch {
            name: req.name.as_ref().map(|n| n.trim().to_string()),
            is_active: req.is_active,
            plan,
            notes: req.notes.clone(),
        };
        if patch.is_empty() {
            return self
                .tenants
                .find_by_id(id)
                .await?
                .ok_or(TenantAdminError::NotFound);
        }
        let tenant = self
            .tenants
            .update(id, &patch)
            .await?
            .ok_or(TenantAdminError::NotFound)?;
        tracing::info!(tenant_id = id, ?patch, "tenant_updated");
        Ok(tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::MemoryStore;
    use crate::domain::tenants::tenant::{Plan, TenantStatus};

    #[tokio::test]
    async fn applies_partial_updates() {
        let store = MemoryStore::new();
        let owner = store.add_user("org", false);
        let tenant = store.seed_tenant(owner.id, "org", "org.tabs.example.org");

        let updated = UpdateTenant { tenants: &store }
            .execute(
                tenant.id,
                &UpdateTenantRequest {
                    is_active: Some(false),
                    plan: Some("enterprise".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.plan, Plan::Enterprise);
        assert_eq!(updated.status(), TenantStatus::Inactive);
        assert_eq!(updated.name, tenant.name);
        assert_eq!(updated.schema_name, "org");
    }

    #[tokio::test]
    async fn unknown_tenant_is_not_found() {
        let store = MemoryStore::new();
        let res = UpdateTenant { tenants: &store }
            .execute(
                5,
                &UpdateTenantRequest {
                    notes: Some("hello".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(res, Err(TenantAdminError::NotFound)));
    }

    #[tokio::test]
    async fn rejects_blank_name_and_bad_plan() {
        let store = MemoryStore::new();
        let owner = store.add_user("org", false);
        let tenant = store.seed_tenant(owner.id, "org", "org.tabs.example.org");

        let res = UpdateTenant { tenants: &store }
            .execute(
                tenant.id,
                &UpdateTenantRequest {
                    name: Some(String::new()),
                    plan: Some("platinum".into()),
                    ..Default::default()
                },
            )
            .await;

        match res {
            Err(TenantAdminError::Validation(errors)) => {
                assert!(errors.contains("name"));
                assert!(errors.contains("plan"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
