use chrono::{DateTime, Duration, Utc};

use crate::application::ports::tenant_repository::{TenantRepository, TenantStatsRow};
use crate::domain::tenants::tenant::Plan;

pub const RECENT_SIGNUP_DAYS: i64 = 30;

pub struct TenantStats<'a, T: TenantRepository + ?Sized> {
    pub tenants: &'a T,
}

impl<'a, T: TenantRepository + ?Sized> TenantStats<'a, T> {
    pub async fn execute(&self, now: DateTime<Utc>) -> anyhow::Result<TenantStatsRow> {
        let mut stats = self
            .tenants
            .stats(now - Duration::days(RECENT_SIGNUP_DAYS))
            .await?;
        // Every plan is reported, including those nobody is on.
        let counted = std::mem::take(&mut stats.tenants_by_plan);
        stats.tenants_by_plan = Plan::ALL
            .into_iter()
            .map(|plan| {
                let n = counted
                    .iter()
                    .find(|(p, _)| *p == plan)
                    .map(|(_, n)| *n)
                    .unwrap_or(0);
                (plan, n)
            })
            .collect();
        Ok(stats)
    }
}
