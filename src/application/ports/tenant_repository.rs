use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::tenants::tenant::{Domain, Plan, Tenant, TenantStatus, UsageStats};

#[derive(Debug, Clone)]
pub struct NewTenant<'a> {
    pub schema_name: &'a str,
    pub name: &'a str,
    pub owner_id: i64,
    pub plan: Plan,
    pub is_active: bool,
}

/// `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct TenantPatch {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub plan: Option<Plan>,
    pub notes: Option<String>,
}

impl TenantPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.is_active.is_none() && self.plan.is_none() && self.notes.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TenantFilter {
    pub status: Option<TenantStatus>,
    pub plan: Option<Plan>,
    /// Matched case-insensitively against name, schema, owner username and email.
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub struct TenantListRow {
    pub tenant: Tenant,
    pub owner_username: String,
    pub owner_email: String,
    pub primary_domain: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TenantStatsRow {
    pub total_tenants: i64,
    pub active_tenants: i64,
    pub suspended_tenants: i64,
    pub total_storage_mb: f64,
    pub total_users: i64,
    pub total_tournaments: i64,
    pub tenants_by_plan: Vec<(Plan, i64)>,
    pub recent_signups: i64,
}

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn schema_name_exists(&self, schema_name: &str) -> anyhow::Result<bool>;
    async fn domain_exists(&self, domain: &str) -> anyhow::Result<bool>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Tenant>>;
    async fn find_by_owner(&self, owner_id: i64) -> anyhow::Result<Option<Tenant>>;
    async fn find_by_domain(&self, domain: &str) -> anyhow::Result<Option<Tenant>>;
    /// Inserts the tenant and its primary domain atomically.
    async fn create_with_domain(
        &self,
        tenant: NewTenant<'_>,
        domain: &str,
    ) -> anyhow::Result<(Tenant, Domain)>;
    async fn list(&self, filter: &TenantFilter) -> anyhow::Result<(Vec<TenantListRow>, i64)>;
    async fn list_domains(&self, tenant_id: i64) -> anyhow::Result<Vec<Domain>>;
    async fn update(&self, id: i64, patch: &TenantPatch) -> anyhow::Result<Option<Tenant>>;
    async fn set_suspended(&self, id: i64, suspended: bool) -> anyhow::Result<Option<Tenant>>;
    async fn record_usage(&self, id: i64, usage: &UsageStats) -> anyhow::Result<Option<Tenant>>;
    async fn stats(&self, signups_since: DateTime<Utc>) -> anyhow::Result<TenantStatsRow>;
}
