use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const SITE_NAME_SUFFIX: &str = "'s Site";

/// Width of `tenants.name`, counted in characters.
pub const MAX_TENANT_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl Plan {
    pub const ALL: [Plan; 4] = [Plan::Free, Plan::Basic, Plan::Pro, Plan::Enterprise];

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Basic => "basic",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plan `{0}`")]
pub struct UnknownPlan(pub String);

impl FromStr for Plan {
    type Err = UnknownPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Plan::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPlan(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Suspended,
    Inactive,
}

impl TenantStatus {
    /// Suspension wins over the active flag.
    pub fn derive(is_active: bool, is_suspended: bool) -> Self {
        if is_suspended {
            TenantStatus::Suspended
        } else if is_active {
            TenantStatus::Active
        } else {
            TenantStatus::Inactive
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
            TenantStatus::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub schema_name: String,
    pub owner_id: i64,
    pub is_active: bool,
    pub is_suspended: bool,
    pub suspended_at: Option<DateTime<Utc>>,
    pub plan: Plan,
    pub storage_used_mb: f64,
    pub total_users: i32,
    pub total_tournaments: i32,
    pub last_activity: DateTime<Utc>,
    pub notes: String,
    pub created_on: NaiveDate,
}

impl Tenant {
    pub fn status(&self) -> TenantStatus {
        TenantStatus::derive(self.is_active, self.is_suspended)
    }

    pub fn can_access(&self) -> bool {
        self.is_active && !self.is_suspended
    }

    /// Names still following the auto-generated pattern track the owner's username.
    pub fn has_generated_name(&self) -> bool {
        self.name.ends_with(SITE_NAME_SUFFIX)
    }
}

/// `"{username}'s Site"`, with the username shortened on a char boundary so
/// the whole name fits `MAX_TENANT_NAME_LEN` and keeps its suffix.
pub fn site_name_for(username: &str) -> String {
    let room = MAX_TENANT_NAME_LEN - SITE_NAME_SUFFIX.chars().count();
    let head: String = username.chars().take(room).collect();
    format!("{head}{SITE_NAME_SUFFIX}")
}

#[derive(Debug, Clone)]
pub struct Domain {
    pub id: i64,
    pub domain: String,
    pub tenant_id: i64,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UsageStats {
    pub storage_used_mb: f64,
    pub total_users: i32,
    pub total_tournaments: i32,
}

/// Per-tenant quotas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantLimits {
    pub max_storage_mb: u64,
    pub max_users: u32,
    pub max_tournaments: u32,
}

impl TenantLimits {
    /// Names of the quotas `usage` is over, empty when within all of them.
    pub fn exceeded_by(&self, usage: &UsageStats) -> Vec<&'static str> {
        let mut over = Vec::new();
        if usage.storage_used_mb > self.max_storage_mb as f64 {
            over.push("storage");
        }
        if i64::from(usage.total_users) > i64::from(self.max_users) {
            over.push("users");
        }
        if i64::from(usage.total_tournaments) > i64::from(self.max_tournaments) {
            over.push("tournaments");
        }
        over
    }
}
