use crate::application::ports::tenant_repository::{TenantPatch, TenantRepository};
use crate::application::ports::user_repository::{UserRepository, UserRow};
use crate::domain::tenants::tenant::site_name_for;

/// Changes a username and keeps an auto-named tenant ("<username>'s Site") in step.
pub struct RenameUser<'a, R, T>
where
    R: UserRepository + ?Sized,
    T: TenantRepository + ?Sized,
{
    pub repo: &'a R,
    pub tenants: &'a T,
}

impl<'a, R, T> RenameUser<'a, R, T>
where
    R: UserRepository + ?Sized,
    T: TenantRepository + ?Sized,
{
    pub async fn execute(&self, user_id: i64, username: &str) -> anyhow::Result<Option<UserRow>> {
        let username = username.trim();
        anyhow::ensure!(!username.is_empty(), "username must not be empty");
        let Some(user) = self.repo.update_username(user_id, username).await? else {
            return Ok(None);
        };
        if let Some(tenant) = self.tenants.find_by_owner(user.id).await? {
            if tenant.has_generated_name() {
                let patch = TenantPatch {
                    name: Some(site_name_for(&user.username)),
                    ..Default::default()
                };
                self.tenants.update(tenant.id, &patch).await?;
            }
        }
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::MemoryStore;

    #[tokio::test]
    async fn generated_tenant_name_follows_username() {
        let store = MemoryStore::new();
        let user = store.add_user("jane", false);
        store.seed_tenant(user.id, "jane", "jane.tabs.example.org");

        RenameUser {
            repo: &store,
            tenants: &store,
        }
        .execute(user.id, "janet")
        .await
        .unwrap();

        let tenant = store.find_by_owner(user.id).await.unwrap().unwrap();
        assert_eq!(tenant.name, "janet's Site");
        assert_eq!(tenant.schema_name, "jane");
    }

    #[tokio::test]
    async fn long_username_keeps_tenant_name_within_limit() {
        let store = MemoryStore::new();
        let user = store.add_user("jane", false);
        store.seed_tenant(user.id, "jane", "jane.tabs.example.org");
        let long = "j".repeat(150);

        let renamed = RenameUser {
            repo: &store,
            tenants: &store,
        }
        .execute(user.id, &long)
        .await
        .unwrap()
        .unwrap();

        assert_eq!(renamed.username, long);
        let tenant = store.find_by_owner(user.id).await.unwrap().unwrap();
        assert_eq!(tenant.name, format!("{}'s Site", "j".repeat(93)));
    }

    #[tokio::test]
    async fn custom_tenant_name_is_kept() {
        let store = MemoryStore::new();
        let user = store.add_user("jane", false);
        let tenant = store.seed_tenant(user.id, "jane", "jane.tabs.example.org");
        store
            .update(
                tenant.id,
                &TenantPatch {
                    name: Some("Jane's Open".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        RenameUser {
            repo: &store,
            tenants: &store,
        }
        .execute(user.id, "janet")
        .await
        .unwrap();

        let tenant = store.find_by_owner(user.id).await.unwrap().unwrap();
        assert_eq!(tenant.name, "Jane's Open");
    }
}
