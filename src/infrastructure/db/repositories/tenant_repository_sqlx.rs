use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};

use crate::application::ports::tenant_repository::{
    NewTenant, TenantFilter, TenantListRow, TenantPatch, TenantRepository, TenantStatsRow,
};
use crate::domain::tenants::tenant::{Domain, Plan, Tenant, TenantStatus, UsageStats};
use crate::infrastructure::db::PgPool;

const TENANT_COLUMNS: &str = "t.id, t.name, t.schema_name, t.owner_id, t.is_active, \
     t.is_suspended, t.suspended_at, t.plan, t.storage_used_mb, t.total_users, \
     t.total_tournaments, t.last_activity, t.notes, t.created_on";

const RETURNING_TENANT: &str = "RETURNING id, name, schema_name, owner_id, is_active, \
     is_suspended, suspended_at, plan, storage_used_mb, total_users, total_tournaments, \
     last_activity, notes, created_on";

pub struct SqlxTenantRepository {
    pub pool: PgPool,
}

impl SqlxTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_tenant(r: &PgRow) -> anyhow::Result<Tenant> {
    let plan: String = r.get("plan");
    Ok(Tenant {
        id: r.get("id"),
        name: r.get("name"),
        schema_name: r.get("schema_name"),
        owner_id: r.get("owner_id"),
        is_active: r.get("is_active"),
        is_suspended: r.get("is_suspended"),
        suspended_at: r.get("suspended_at"),
        plan: plan.parse()?,
        storage_used_mb: r.get("storage_used_mb"),
        total_users: r.get("total_users"),
        total_tournaments: r.get("total_tournaments"),
        last_activity: r.get("last_activity"),
        notes: r.get("notes"),
        created_on: r.get("created_on"),
    })
}

fn map_domain(r: &PgRow) -> Domain {
    Domain {
        id: r.get("id"),
        domain: r.get("domain"),
        tenant_id: r.get("tenant_id"),
        is_primary: r.get("is_primary"),
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &TenantFilter) {
    qb.push(" WHERE TRUE");
    match filter.status {
        Some(TenantStatus::Active) => {
            qb.push(" AND t.is_active AND NOT t.is_suspended");
        }
        Some(TenantStatus::Suspended) => {
            qb.push(" AND t.is_suspended");
        }
        Some(TenantStatus::Inactive) => {
            qb.push(" AND NOT t.is_active AND NOT t.is_suspended");
        }
        None => {}
    }
    if let Some(plan) = filter.plan {
        qb.push(" AND t.plan = ").push_bind(plan.as_str());
    }
    if let Some(search) = filter.search.as_deref() {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (t.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.schema_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[async_trait]
impl TenantRepository for SqlxTenantRepository {
    async fn schema_name_exists(&self, schema_name: &str) -> anyhow::Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tenants WHERE schema_name = $1)")
                .bind(schema_name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn domain_exists(&self, domain: &str) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM domains WHERE domain = $1)")
            .bind(domain)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Tenant>> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants t WHERE t.id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(map_tenant).transpose()
    }

    async fn find_by_owner(&self, owner_id: i64) -> anyhow::Result<Option<Tenant>> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants t WHERE t.owner_id = $1");
        let row = sqlx::query(&sql)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_tenant).transpose()
    }

    async fn find_by_domain(&self, domain: &str) -> anyhow::Result<Option<Tenant>> {
        let sql = format!(
            "SELECT {TENANT_COLUMNS} FROM tenants t
             JOIN domains d ON d.tenant_id = t.id
             WHERE d.domain = $1"
        );
        let row = sqlx::query(&sql)
            .bind(domain)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_tenant).transpose()
    }

    async fn create_with_domain(
        &self,
        tenant: NewTenant<'_>,
        domain: &str,
    ) -> anyhow::Result<(Tenant, Domain)> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "INSERT INTO tenants (schema_name, name, owner_id, plan, is_active)
             VALUES ($1, $2, $3, $4, $5) {RETURNING_TENANT}"
        );
        let row = sqlx::query(&sql)
            .bind(tenant.schema_name)
            .bind(tenant.name)
            .bind(tenant.owner_id)
            .bind(tenant.plan.as_str())
            .bind(tenant.is_active)
            .fetch_one(&mut *tx)
            .await?;
        let created = map_tenant(&row)?;

        let row = sqlx::query(
            "INSERT INTO domains (domain, tenant_id, is_primary) VALUES ($1, $2, TRUE)
             RETURNING id, domain, tenant_id, is_primary",
        )
        .bind(domain)
        .bind(created.id)
        .fetch_one(&mut *tx)
        .await?;
        let domain = map_domain(&row);
        tx.commit().await?;
        Ok((created, domain))
    }

    async fn list(&self, filter: &TenantFilter) -> anyhow::Result<(Vec<TenantListRow>, i64)> {
        let mut count_qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM tenants t JOIN users u ON u.id = t.owner_id");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {TENANT_COLUMNS}, u.username AS owner_username, u.email AS owner_email,
                    (SELECT d.domain FROM domains d
                      WHERE d.tenant_id = t.id AND d.is_primary LIMIT 1) AS primary_domain
             FROM tenants t JOIN users u ON u.id = t.owner_id"
        ));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY t.created_on DESC, t.id DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);
        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut items = Vec::with_capacity(rows.len());
        for r in &rows {
            items.push(TenantListRow {
                tenant: map_tenant(r)?,
                owner_username: r.get("owner_username"),
                owner_email: r.get("owner_email"),
                primary_domain: r.get("primary_domain"),
            });
        }
        Ok((items, total))
    }

    async fn list_domains(&self, tenant_id: i64) -> anyhow::Result<Vec<Domain>> {
        let rows = sqlx::query(
            "SELECT id, domain, tenant_id, is_primary FROM domains
             WHERE tenant_id = $1 ORDER BY domain",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(map_domain).collect())
    }

    async fn update(&self, id: i64, patch: &TenantPatch) -> anyhow::Result<Option<Tenant>> {
        let sql = format!(
            "UPDATE tenants SET
                name = COALESCE($2, name),
                is_active = COALESCE($3, is_active),
                plan = COALESCE($4, plan),
                notes = COALESCE($5, notes)
             WHERE id = $1 {RETURNING_TENANT}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.is_active)
            .bind(patch.plan.map(|p| p.as_str()))
            .bind(patch.notes.as_deref())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_tenant).transpose()
    }

    async fn set_suspended(&self, id: i64, suspended: bool) -> anyhow::Result<Option<Tenant>> {
        let sql = format!(
            "UPDATE tenants SET
                is_suspended = $2,
                suspended_at = CASE WHEN $2 THEN now() ELSE NULL END
             WHERE id = $1 {RETURNING_TENANT}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(suspended)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_tenant).transpose()
    }

    async fn record_usage(&self, id: i64, usage: &UsageStats) -> anyhow::Result<Option<Tenant>> {
        let sql = format!(
            "UPDATE tenants SET
                storage_used_mb = $2,
                total_users = $3,
                total_tournaments = $4,
                last_activity = now()
             WHERE id = $1 {RETURNING_TENANT}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(usage.storage_used_mb)
            .bind(usage.total_users)
            .bind(usage.total_tournaments)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_tenant).transpose()
    }

    async fn stats(&self, signups_since: DateTime<Utc>) -> anyhow::Result<TenantStatsRow> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) AS total_tenants,
                COUNT(*) FILTER (WHERE is_active AND NOT is_suspended) AS active_tenants,
                COUNT(*) FILTER (WHERE is_suspended) AS suspended_tenants,
                COALESCE(SUM(storage_used_mb), 0)::DOUBLE PRECISION AS total_storage_mb,
                COALESCE(SUM(total_users), 0)::BIGINT AS total_users,
                COALESCE(SUM(total_tournaments), 0)::BIGINT AS total_tournaments,
                COUNT(*) FILTER (WHERE created_on >= $1) AS recent_signups
             FROM tenants",
        )
        .bind(signups_since.date_naive())
        .fetch_one(&self.pool)
        .await?;

        let plan_rows = sqlx::query("SELECT plan, COUNT(*) AS n FROM tenants GROUP BY plan")
            .fetch_all(&self.pool)
            .await?;
        let mut tenants_by_plan = Vec::with_capacity(plan_rows.len());
        for r in &plan_rows {
            let plan: String = r.get("plan");
            tenants_by_plan.push((plan.parse::<Plan>()?, r.get::<i64, _>("n")));
        }

        Ok(TenantStatsRow {
            total_tenants: row.get("total_tenants"),
            active_tenants: row.get("active_tenants"),
            suspended_tenants: row.get("suspended_tenants"),
            total_storage_mb: row.get("total_storage_mb"),
            total_users: row.get("total_users"),
            total_tournaments: row.get("total_tournaments"),
            tenants_by_plan,
            recent_signups: row.get("recent_signups"),
        })
    }
}
