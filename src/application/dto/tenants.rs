use chrono::{DateTime, NaiveDate, Utc};

use crate::application::ports::tenant_repository::TenantListRow;
use crate::application::ports::user_repository::UserRow;
use crate::domain::tenants::tenant::{Domain, Plan, Tenant, TenantStatus};

#[derive(Debug, Clone)]
pub struct TenantListItemDto {
    pub id: i64,
    pub schema_name: String,
    pub name: String,
    pub owner_username: String,
    pub owner_email: String,
    pub primary_domain: Option<String>,
    pub status: TenantStatus,
    pub plan: Plan,
    pub total_tournaments: i32,
    pub total_users: i32,
    pub created_on: NaiveDate,
    pub last_activity: DateTime<Utc>,
}

impl From<TenantListRow> for TenantListItemDto {
    fn from(row: TenantListRow) -> Self {
        let status = row.tenant.status();
        let t = row.tenant;
        TenantListItemDto {
            id: t.id,
            schema_name: t.schema_name,
            name: t.name,
            owner_username: row.owner_username,
            owner_email: row.owner_email,
            primary_domain: row.primary_domain,
            status,
            plan: t.plan,
            total_tournaments: t.total_tournaments,
            total_users: t.total_users,
            created_on: t.created_on,
            last_activity: t.last_activity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TenantPageDto {
    pub items: Vec<TenantListItemDto>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub struct TenantDetailDto {
    pub tenant: Tenant,
    pub owner: UserRow,
    pub domains: Vec<Domain>,
}
