use crate::application::ports::schema_provisioner::SchemaProvisioner;
use crate::application::ports::tenant_repository::{NewTenant, TenantRepository};
use crate::application::ports::user_repository::UserRepository;
use crate::application::use_cases::tenants::error::TenantAdminError;
use crate::application::validation::FieldErrors;
use crate::domain::tenants::naming::{
    is_reserved_schema_name, is_valid_schema_name, normalize_domain,
};
use crate::domain::tenants::tenant::{MAX_TENANT_NAME_LEN, Plan, Tenant};

#[derive(Debug, Clone)]
pub struct CreateTenantRequest {
    pub schema_name: String,
    pub name: String,
    pub owner_id: i64,
    pub domain: String,
    pub plan: Option<String>,
    pub is_active: Option<bool>,
}

pub struct CreateTenant<'a, T, U, S>
where
    T: TenantRepository + ?Sized,
    U: UserRepository + ?Sized,
    S: SchemaProvisioner + ?Sized,
{
    pub tenants: &'a T,
    pub users: &'a U,
    pub schemas: &'a S,
}

pub(crate) fn validate_name(name: &str, errors: &mut FieldErrors) {
    if name.trim().is_empty() {
        errors.add("name", "This field may not be blank.");
    } else if name.chars().count() > MAX_TENANT_NAME_LEN {
        errors.add(
            "name",
            format!("Ensure this field has no more than {MAX_TENANT_NAME_LEN} characters."),
        );
    }
}

pub(crate) fn parse_plan(raw: &str, errors: &mut FieldErrors) -> Option<Plan> {
    match raw.parse::<Plan>() {
        Ok(plan) => Some(plan),
        Err(_) => {
            errors.add("plan", format!("\"{raw}\" is not a valid choice."));
            None
        }
    }
}

impl<'a, T, U, S> CreateTenant<'a, T, U, S>
where
    T: TenantRepository + ?Sized,
    U: UserRepository + ?Sized,
    S: SchemaProvisioner + ?Sized,
{
    pub async fn execute(&self, req: &CreateTenantRequest) -> Result<Tenant, TenantAdminError> {
        let mut errors = FieldErrors::new();

        if self.tenants.schema_name_exists(&req.schema_name).await? {
            errors.add("schema_name", "Schema name already exists.");
        } else if is_reserved_schema_name(&req.schema_name) {
            errors.add("schema_name", "Schema name is reserved.");
        } else if !is_valid_schema_name(&req.schema_name) {
            errors.add(
                "schema_name",
                "Schema name must start with a letter and contain only lowercase letters, \
                 numbers, and underscores (max 63 characters).",
            );
        }

        let domain = normalize_domain(&req.domain);
        if domain.is_empty() {
            errors.add("domain", "This field may not be blank.");
        } else if self.tenants.domain_exists(&domain).await? {
            errors.add("domain", "Domain already exists.");
        }

        match self.users.find_by_id(req.owner_id).await? {
            None => errors.add("owner_id", "User not found."),
            Some(owner) => {
                if self.tenants.find_by_owner(owner.id).await?.is_some() {
                    errors.add("owner_id", "User already has a tenant.");
                }
            }
        }

        validate_name(&req.name, &mut errors);
        let plan = match req.plan.as_deref() {
            Some(raw) => parse_plan(raw, &mut errors),
            None => Some(Plan::default()),
        };

        errors.into_result()?;
        let plan = plan.unwrap_or_default();

        self.schemas.create_schema(&req.schema_name).await?;
        let (tenant, domain) = self
            .tenants
            .create_with_domain(
                NewTenant {
                    schema_name: &req.schema_name,
                    name: req.name.trim(),
                    owner_id: req.owner_id,
                    plan,
                    is_active: req.is_active.unwrap_or(true),
                },
                &domain,
            )
            .await?;
        tracing::info!(
            tenant_id = tenant.id,
            schema = %tenant.schema_name,
            domain = %domain.domain,
            owner_id = tenant.owner_id,
            "tenant_created_by_admin"
        );
        Ok(tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::MemoryStore;

    fn request(owner_id: i64) -> CreateTenantRequest {
        CreateTenantRequest {
            schema_name: "worlds".into(),
            name: "Worlds 2026".into(),
            owner_id,
            domain: "worlds.tabs.example.org".into(),
            plan: Some("pro".into()),
            is_active: None,
        }
    }

    async fn run(store: &MemoryStore, req: &CreateTenantRequest) -> Result<Tenant, TenantAdminError> {
        CreateTenant {
            tenants: store,
            users: store,
            schemas: store,
        }
        .execute(req)
        .await
    }

    fn field_errors(res: Result<Tenant, TenantAdminError>) -> FieldErrors {
        match res {
            Err(TenantAdminError::Validation(e)) => e,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn creates_tenant_with_primary_domain() {
        let store = MemoryStore::new();
        let owner = store.add_user("org", false);

        let tenant = run(&store, &request(owner.id)).await.unwrap();

        assert_eq!(tenant.schema_name, "worlds");
        assert_eq!(tenant.plan, Plan::Pro);
        assert!(tenant.is_active);
        let domains = store.list_domains(tenant.id).await.unwrap();
        assert_eq!(domains.len(), 1);
        assert!(domains[0].is_primary);
        assert_eq!(*store.schemas.lock().unwrap(), vec!["worlds".to_string()]);
    }

    #[tokio::test]
    async fn rejects_second_tenant_for_owner() {
        let store = MemoryStore::new();
        let owner = store.add_user("org", false);
        store.seed_tenant(owner.id, "org", "org.tabs.example.org");

        let errors = field_errors(run(&store, &request(owner.id)).await);

        assert_eq!(errors.messages("owner_id"), ["User already has a tenant."]);
        assert_eq!(store.tenant_count(), 1);
    }

    #[tokio::test]
    async fn rejects_unknown_owner() {
        let store = MemoryStore::new();
        let errors = field_errors(run(&store, &request(99)).await);
        assert_eq!(errors.messages("owner_id"), ["User not found."]);
    }

    #[tokio::test]
    async fn reports_every_invalid_field() {
        let store = MemoryStore::new();
        let other = store.add_user("other", false);
        store.seed_tenant(other.id, "taken", "taken.tabs.example.org");
        let owner = store.add_user("org", false);

        let mut req = request(owner.id);
        req.schema_name = "taken".into();
        req.domain = "taken.tabs.example.org".into();
        req.plan = Some("gold".into());
        req.name = "  ".into();

        let errors = field_errors(run(&store, &req).await);

        assert_eq!(errors.messages("schema_name"), ["Schema name already exists."]);
        assert_eq!(errors.messages("domain"), ["Domain already exists."]);
        assert!(errors.contains("plan"));
        assert!(errors.contains("name"));
        assert!(!errors.contains("owner_id"));
    }

    #[tokio::test]
    async fn rejects_reserved_schema_names() {
        let store = MemoryStore::new();
        let owner = store.add_user("org", false);
        for reserved in ["public", "information_schema", "pg_catalog"] {
            let mut req = request(owner.id);
            req.schema_name = reserved.into();
            let errors = field_errors(run(&store, &req).await);
            assert_eq!(errors.messages("schema_name"), ["Schema name is reserved."]);
        }
        assert_eq!(store.tenant_count(), 0);
        assert!(store.schemas.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn domains_are_stored_lowercase_and_compared_that_way() {
        let store = MemoryStore::new();
        let first = store.add_user("org", false);
        let mut req = request(first.id);
        req.domain = "Club.Tabs.Example.org.".into();

        let tenant = run(&store, &req).await.unwrap();
        let domains = store.list_domains(tenant.id).await.unwrap();
        assert_eq!(domains[0].domain, "club.tabs.example.org");

        let second = store.add_user("other", false);
        let mut req = request(second.id);
        req.schema_name = "club_two".into();
        req.domain = "club.tabs.example.org".into();
        let errors = field_errors(run(&store, &req).await);
        assert_eq!(errors.messages("domain"), ["Domain already exists."]);
    }

    #[tokio::test]
    async fn rejects_malformed_schema_names() {
        let store = MemoryStore::new();
        let owner = store.add_user("org", false);
        for bad in ["1worlds", "Worlds", "wor-lds", ""] {
            let mut req = request(owner.id);
            req.schema_name = bad.into();
            let errors = field_errors(run(&store, &req).await);
            assert!(errors.contains("schema_name"), "{bad:?} accepted");
        }
        assert_eq!(store.tenant_count(), 0);
    }
}
