//! In-memory port implementations for use-case tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::application::ports::cache_port::CachePort;
use crate::application::ports::schema_provisioner::SchemaProvisioner;
use crate::application::ports::tenant_repository::{
    NewTenant, TenantFilter, TenantListRow, TenantPatch, TenantRepository, TenantStatsRow,
};
use crate::application::ports::user_repository::{NewUser, UserRepository, UserRow};
use crate::domain::tenants::tenant::{Domain, MAX_TENANT_NAME_LEN, Plan, Tenant, UsageStats};

/// Mirrors the `VARCHAR(100)` limit on `tenants.name`.
fn check_name_width(name: &str) -> anyhow::Result<()> {
    anyhow::ensure!(
        name.chars().count() <= MAX_TENANT_NAME_LEN,
        "value too long for type character varying({MAX_TENANT_NAME_LEN})"
    );
    Ok(())
}

#[derive(Default)]
pub struct MemoryStore {
    pub users: Mutex<Vec<UserRow>>,
    pub tenants: Mutex<Vec<Tenant>>,
    pub domains: Mutex<Vec<Domain>>,
    pub schemas: Mutex<Vec<String>>,
    pub usage: Mutex<HashMap<String, UsageStats>>,
    pub fail_schema_creation: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str, is_superuser: bool) -> UserRow {
        let mut users = self.users.lock().unwrap();
        let row = UserRow {
            id: users.len() as i64 + 1,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: None,
            is_superuser,
            date_joined: Utc::now(),
        };
        users.push(row.clone());
        row
    }

    pub fn seed_tenant(&self, owner_id: i64, schema_name: &str, domain: &str) -> Tenant {
        let mut tenants = self.tenants.lock().unwrap();
        let tenant = Tenant {
            id: tenants.len() as i64 + 1,
            name: format!("{schema_name}'s Site"),
            schema_name: schema_name.to_string(),
            owner_id,
            is_active: true,
            is_suspended: false,
            suspended_at: None,
            plan: Plan::Free,
            storage_used_mb: 0.0,
            total_users: 0,
            total_tournaments: 0,
            last_activity: Utc::now(),
            notes: String::new(),
            created_on: Utc::now().date_naive(),
        };
        tenants.push(tenant.clone());
        let mut domains = self.domains.lock().unwrap();
        let id = domains.len() as i64 + 1;
        domains.push(Domain {
            id,
            domain: domain.to_string(),
            tenant_id: tenant.id,
            is_primary: true,
        });
        tenant
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.lock().unwrap().len()
    }

    pub fn domain_count(&self) -> usize {
        self.domains.lock().unwrap().len()
    }

    fn primary_domain(&self, tenant_id: i64) -> Option<String> {
        self.domains
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.tenant_id == tenant_id && d.is_primary)
            .map(|d| d.domain.clone())
    }

    fn modify<F: FnOnce(&mut Tenant)>(&self, id: i64, f: F) -> Option<Tenant> {
        let mut tenants = self.tenants.lock().unwrap();
        let t = tenants.iter_mut().find(|t| t.id == id)?;
        f(t);
        Some(t.clone())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser<'_>) -> anyhow::Result<UserRow> {
        if self.find_by_username(user.username).await?.is_some() {
            anyhow::bail!("duplicate username");
        }
        let mut row = self.add_user(user.username, user.is_superuser);
        row.email = user.email.to_string();
        row.password_hash = Some(user.password_hash.to_string());
        let mut users = self.users.lock().unwrap();
        if let Some(u) = users.iter_mut().find(|u| u.id == row.id) {
            *u = row.clone();
        }
        Ok(row)
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<UserRow>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<UserRow>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn update_username(&self, id: i64, username: &str) -> anyhow::Result<Option<UserRow>> {
        let mut users = self.users.lock().unwrap();
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            u.username = username.to_string();
            u.clone()
        }))
    }
}

#[async_trait]
impl TenantRepository for MemoryStore {
    async fn schema_name_exists(&self, schema_name: &str) -> anyhow::Result<bool> {
        Ok(self
            .tenants
            .lock()
            .unwrap()
            .iter()
            .any(|t| t.schema_name == schema_name))
    }

    async fn domain_exists(&self, domain: &str) -> anyhow::Result<bool> {
        Ok(self.domains.lock().unwrap().iter().any(|d| d.domain == domain))
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Tenant>> {
        Ok(self.tenants.lock().unwrap().iter().find(|t| t.id == id).cloned())
    }

    async fn find_by_owner(&self, owner_id: i64) -> anyhow::Result<Option<Tenant>> {
        Ok(self
            .tenants
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.owner_id == owner_id)
            .cloned())
    }

    async fn find_by_domain(&self, domain: &str) -> anyhow::Result<Option<Tenant>> {
        let tenant_id = self
            .domains
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.domain == domain)
            .map(|d| d.tenant_id);
        match tenant_id {
            Some(id) => TenantRepository::find_by_id(self, id).await,
            None => Ok(None),
        }
    }

    async fn create_with_domain(
        &self,
        tenant: NewTenant<'_>,
        domain: &str,
    ) -> anyhow::Result<(Tenant, Domain)> {
        if self.schema_name_exists(tenant.schema_name).await? || self.domain_exists(domain).await? {
            anyhow::bail!("unique violation");
        }
        check_name_width(tenant.name)?;
        let mut created = self.seed_tenant(tenant.owner_id, tenant.schema_name, domain);
        created = self
            .modify(created.id, |t| {
                t.name = tenant.name.to_string();
                t.plan = tenant.plan;
                t.is_active = tenant.is_active;
            })
            .unwrap_or(created);
        let domain = self
            .domains
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.domain == domain)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("domain missing"))?;
        Ok((created, domain))
    }

    async fn list(&self, filter: &TenantFilter) -> anyhow::Result<(Vec<TenantListRow>, i64)> {
        let tenants = self.tenants.lock().unwrap().clone();
        let users = self.users.lock().unwrap().clone();
        let mut rows: Vec<TenantListRow> = tenants
            .into_iter()
            .filter(|t| filter.status.is_none_or(|s| t.status() == s))
            .filter(|t| filter.plan.is_none_or(|p| t.plan == p))
            .filter_map(|t| {
                let owner = users.iter().find(|u| u.id == t.owner_id)?;
                if let Some(q) = filter.search.as_deref() {
                    let q = q.to_lowercase();
                    let hit = [&t.name, &t.schema_name, &owner.username, &owner.email]
                        .iter()
                        .any(|s| s.to_lowercase().contains(&q));
                    if !hit {
                        return None;
                    }
                }
                Some(TenantListRow {
                    primary_domain: self.primary_domain(t.id),
                    owner_username: owner.username.clone(),
                    owner_email: owner.email.clone(),
                    tenant: t,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.tenant.id.cmp(&a.tenant.id));
        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn list_domains(&self, tenant_id: i64) -> anyhow::Result<Vec<Domain>> {
        Ok(self
            .domains
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn update(&self, id: i64, patch: &TenantPatch) -> anyhow::Result<Option<Tenant>> {
        if let Some(name) = &patch.name {
            check_name_width(name)?;
        }
        Ok(self.modify(id, |t| {
            if let Some(name) = &patch.name {
                t.name = name.clone();
            }
            if let Some(active) = patch.is_active {
                t.is_active = active;
            }
            if let Some(plan) = patch.plan {
                t.plan = plan;
            }
            if let Some(notes) = &patch.notes {
                t.notes = notes.clone();
            }
        }))
    }

    async fn set_suspended(&self, id: i64, suspended: bool) -> anyhow::Result<Option<Tenant>> {
        Ok(self.modify(id, |t| {
            t.is_suspended = suspended;
            t.suspended_at = suspended.then(Utc::now);
        }))
    }

    async fn record_usage(&self, id: i64, usage: &UsageStats) -> anyhow::Result<Option<Tenant>> {
        Ok(self.modify(id, |t| {
            t.storage_used_mb = usage.storage_used_mb;
            t.total_users = usage.total_users;
            t.total_tournaments = usage.total_tournaments;
            t.last_activity = Utc::now();
        }))
    }

    async fn stats(&self, signups_since: DateTime<Utc>) -> anyhow::Result<TenantStatsRow> {
        let tenants = self.tenants.lock().unwrap().clone();
        let mut by_plan: Vec<(Plan, i64)> = Vec::new();
        for t in &tenants {
            match by_plan.iter_mut().find(|(p, _)| *p == t.plan) {
                Some((_, n)) => *n += 1,
                None => by_plan.push((t.plan, 1)),
            }
        }
        Ok(TenantStatsRow {
            total_tenants: tenants.len() as i64,
            active_tenants: tenants.iter().filter(|t| t.can_access()).count() as i64,
            suspended_tenants: tenants.iter().filter(|t| t.is_suspended).count() as i64,
            total_storage_mb: tenants.iter().map(|t| t.storage_used_mb).sum(),
            total_users: tenants.iter().map(|t| t.total_users as i64).sum(),
            total_tournaments: tenants.iter().map(|t| t.total_tournaments as i64).sum(),
            tenants_by_plan: by_plan,
            recent_signups: tenants
                .iter()
                .filter(|t| t.created_on >= signups_since.date_naive())
                .count() as i64,
        })
    }
}

#[async_trait]
impl SchemaProvisioner for MemoryStore {
    async fn create_schema(&self, schema_name: &str) -> anyhow::Result<()> {
        if *self.fail_schema_creation.lock().unwrap() {
            anyhow::bail!("permission denied to create schema");
        }
        let mut schemas = self.schemas.lock().unwrap();
        if schemas.iter().any(|s| s == schema_name) {
            anyhow::bail!("schema \"{schema_name}\" already exists");
        }
        schemas.push(schema_name.to_string());
        Ok(())
    }

    async fn measure_usage(&self, schema_name: &str) -> anyhow::Result<UsageStats> {
        Ok(self
            .usage
            .lock()
            .unwrap()
            .get(schema_name)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemoryCache {
    pub entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl CachePort for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str, _ttl: Duration) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    async fn delete(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}
