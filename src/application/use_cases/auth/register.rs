use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString},
};
use password_hash::rand_core::OsRng;

use crate::application::ports::schema_provisioner::SchemaProvisioner;
use crate::application::ports::tenant_repository::TenantRepository;
use crate::application::ports::user_repository::{NewUser, UserRepository, UserRow};
use crate::application::use_cases::tenants::provision_tenant::ProvisionTenant;

pub struct Register<'a, R, T, S>
where
    R: UserRepository + ?Sized,
    T: TenantRepository + ?Sized,
    S: SchemaProvisioner + ?Sized,
{
    pub repo: &'a R,
    pub provision: ProvisionTenant<'a, T, S>,
}

#[derive(Debug, Clone, Default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub is_superuser: bool,
}

impl<'a, R, T, S> Register<'a, R, T, S>
where
    R: UserRepository + ?Sized,
    T: TenantRepository + ?Sized,
    S: SchemaProvisioner + ?Sized,
{
    pub async fn execute(&self, req: &RegisterRequest) -> anyhow::Result<UserRow> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!(e.to_string()))?
            .to_string();
        let user = self
            .repo
            .create_user(NewUser {
                username: &req.username,
                email: &req.email,
                first_name: &req.first_name,
                last_name: &req.last_name,
                password_hash: &hash,
                is_superuser: req.is_superuser,
            })
            .await?;

        // Account creation stands even when tenant setup fails; an admin
        // can create the tenant by hand later.
        if let Err(e) = self.provision.execute(&user).await {
            tracing::error!(
                user_id = user.id,
                username = %user.username,
                error = ?e,
                "tenant_provisioning_failed"
            );
        }
        Ok(user)
    }
}
