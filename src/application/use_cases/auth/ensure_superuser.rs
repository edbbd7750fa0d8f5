use crate::application::ports::schema_provisioner::SchemaProvisioner;
use crate::application::ports::tenant_repository::TenantRepository;
use crate::application::ports::user_repository::{UserRepository, UserRow};
use crate::application::use_cases::auth::register::{Register, RegisterRequest};

/// Creates the configured platform superuser on startup unless the
/// username is already taken. Superusers never receive a tenant.
pub struct EnsureSuperuser<'a, R, T, S>
where
    R: UserRepository + ?Sized,
    T: TenantRepository + ?Sized,
    S: SchemaProvisioner + ?Sized,
{
    pub register: Register<'a, R, T, S>,
}

impl<'a, R, T, S> EnsureSuperuser<'a, R, T, S>
where
    R: UserRepository + ?Sized,
    T: TenantRepository + ?Sized,
    S: SchemaProvisioner + ?Sized,
{
    /// Returns the new row, or `None` when the username already exists.
    pub async fn execute(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> anyhow::Result<Option<UserRow>> {
        if let Some(existing) = self.register.repo.find_by_username(username).await? {
            if !existing.is_superuser {
                tracing::warn!(username, "bootstrap_superuser_name_taken_by_regular_user");
            }
            return Ok(None);
        }
        let user = self
            .register
            .execute(&RegisterRequest {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                is_superuser: true,
                ..Default::default()
            })
            .await?;
        tracing::info!(user_id = user.id, username, "bootstrap_superuser_created");
        Ok(Some(user))
    }
}
