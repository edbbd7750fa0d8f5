use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    routing::{get, post},
};
use chrono::{DateTime, NaiveDate, Utc};
use jsonwebtoken::{EncodingKey, Header};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::application::dto::tenants::{TenantDetailDto, TenantListItemDto};
use crate::application::ports::tenant_repository::TenantFilter;
use crate::application::use_cases::tenants::create_tenant::{CreateTenant, CreateTenantRequest};
use crate::application::use_cases::tenants::get_tenant::GetTenant;
use crate::application::use_cases::tenants::impersonate::{Impersonate, ImpersonationGrant};
use crate::application::use_cases::tenants::list_tenants::ListTenants;
use crate::application::use_cases::tenants::refresh_usage::RefreshUsage;
use crate::application::use_cases::tenants::resolve_tenant::ResolveTenant;
use crate::application::use_cases::tenants::suspend_tenant::{SuspendTenant, SuspendTenantRequest};
use crate::application::use_cases::tenants::tenant_stats::TenantStats;
use crate::application::use_cases::tenants::update_tenant::{UpdateTenant, UpdateTenantRequest};
use crate::application::validation::FieldErrors;
use crate::bootstrap::app_context::AppContext;
use crate::bootstrap::config::Config;
use crate::domain::tenants::tenant::{Plan, TenantStatus};
use crate::presentation::http::auth::{Bearer, require_superuser};
use crate::presentation::http::error::ApiError;

const IMPERSONATION_TTL_SECS: i64 = 60 * 60;
const REQUIRED: &str = "This field is required.";

#[derive(Debug, Serialize, ToSchema)]
pub struct TenantListItem {
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

impl From<TenantListItemDto> for TenantListItem {
    fn from(d: TenantListItemDto) -> Self {
        TenantListItem {
            id: d.id,
            schema_name: d.schema_name,
            name: d.name,
            owner_username: d.owner_username,
            owner_email: d.owner_email,
            primary_domain: d.primary_domain,
            status: d.status,
            plan: d.plan,
            total_tournaments: d.total_tournaments,
            total_users: d.total_users,
            created_on: d.created_on,
            last_activity: d.last_activity,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TenantPage {
    pub items: Vec<TenantListItem>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OwnerSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DomainItem {
    pub id: i64,
    pub domain: String,
    pub is_primary: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TenantDetail {
    pub id: i64,
    pub schema_name: String,
    pub name: String,
    pub owner: OwnerSummary,
    pub domains: Vec<DomainItem>,
    pub status: TenantStatus,
    pub can_access: bool,
    pub is_active: bool,
    pub is_suspended: bool,
    pub suspended_at: Option<DateTime<Utc>>,
    pub plan: Plan,
    pub storage_used_mb: f64,
    pub total_users: i32,
    pub total_tournaments: i32,
    pub created_on: NaiveDate,
    pub last_activity: DateTime<Utc>,
    pub notes: String,
}

impl From<TenantDetailDto> for TenantDetail {
    fn from(d: TenantDetailDto) -> Self {
        let t = d.tenant;
        TenantDetail {
            status: t.status(),
            can_access: t.can_access(),
            id: t.id,
            schema_name: t.schema_name,
            name: t.name,
            owner: OwnerSummary {
                id: d.owner.id,
                username: d.owner.username,
                email: d.owner.email,
                first_name: d.owner.first_name,
                last_name: d.owner.last_name,
                date_joined: d.owner.date_joined,
            },
            domains: d
                .domains
                .into_iter()
                .map(|dom| DomainItem {
                    id: dom.id,
                    domain: dom.domain,
                    is_primary: dom.is_primary,
                })
                .collect(),
            is_active: t.is_active,
            is_suspended: t.is_suspended,
            suspended_at: t.suspended_at,
            plan: t.plan,
            storage_used_mb: t.storage_used_mb,
            total_users: t.total_users,
            total_tournaments: t.total_tournaments,
            created_on: t.created_on,
            last_activity: t.last_activity,
            notes: t.notes,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TenantStatsResponse {
    pub total_tenants: i64,
    pub active_tenants: i64,
    pub suspended_tenants: i64,
    pub total_storage_mb: f64,
    pub total_users: i64,
    pub total_tournaments: i64,
    pub tenants_by_plan: BTreeMap<String, i64>,
    pub recent_signups: i64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTenantsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// `active`, `suspended` or `inactive`.
    pub status: Option<String>,
    pub plan: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTenantBody {
    pub schema_name: Option<String>,
    pub name: Option<String>,
    pub owner_id: Option<i64>,
    pub domain: Option<String>,
    pub plan: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTenantBody {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub plan: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SuspendBody {
    pub suspend: Option<bool>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImpersonateBody {
    pub tenant_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImpersonationResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub tenant_id: i64,
    pub schema_name: String,
    pub owner_username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TenantLookupResponse {
    pub id: i64,
    pub name: String,
    pub schema_name: String,
    pub plan: Plan,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImpersonationClaims {
    pub sub: String,
    pub tenant_id: i64,
    pub schema_name: String,
    pub impersonator: i64,
    pub token_type: String,
    pub iat: usize,
    pub exp: usize,
}

pub fn admin_routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/tenants", get(list_tenants).post(create_tenant))
        .route("/tenants/stats", get(tenant_stats))
        .route("/tenants/:id", get(get_tenant).patch(update_tenant))
        .route("/tenants/:id/suspend", post(suspend_tenant))
        .route("/tenants/:id/refresh-usage", post(refresh_usage))
        .route("/impersonate", post(impersonate))
        .with_state(ctx)
}

pub fn lookup_routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/api/tenant", get(current_tenant))
        .with_state(ctx)
}

fn parse_status(raw: &str, errors: &mut FieldErrors) -> Option<TenantStatus> {
    match raw {
        "active" => Some(TenantStatus::Active),
        "suspended" => Some(TenantStatus::Suspended),
        "inactive" => Some(TenantStatus::Inactive),
        other => {
            errors.add("status", format!("\"{other}\" is not a valid choice."));
            None
        }
    }
}

async fn detail(ctx: &AppContext, id: i64) -> Result<TenantDetail, ApiError> {
    let tenants = ctx.tenant_repo();
    let users = ctx.user_repo();
    let uc = GetTenant {
        tenants: tenants.as_ref(),
        users: users.as_ref(),
    };
    Ok(uc.execute(id).await?.into())
}

#[utoipa::path(get, path = "/api/admin/tenants", tag = "Tenants", params(ListTenantsQuery), responses(
    (status = 200, body = TenantPage),
    (status = 401), (status = 403)
))]
pub async fn list_tenants(
    State(ctx): State<AppContext>,
    bearer: Result<Bearer, StatusCode>,
    Query(q): Query<ListTenantsQuery>,
) -> Result<Json<TenantPage>, ApiError> {
    require_superuser(&ctx, bearer).await?;
    let mut errors = FieldErrors::new();
    let status = q
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .and_then(|s| parse_status(s, &mut errors));
    let plan = match q.plan.as_deref().filter(|p| !p.is_empty()) {
        Some(raw) => match raw.parse::<Plan>() {
            Ok(p) => Some(p),
            Err(_) => {
                errors.add("plan", format!("\"{raw}\" is not a valid choice."));
                None
            }
        },
        None => None,
    };
    errors.into_result()?;

    let tenants = ctx.tenant_repo();
    let page = ListTenants {
        tenants: tenants.as_ref(),
    }
    .execute(TenantFilter {
        status,
        plan,
        search: q.search,
        limit: q.limit.unwrap_or_default(),
        offset: q.offset.unwrap_or_default(),
    })
    .await?;
    Ok(Json(TenantPage {
        items: page.items.into_iter().map(Into::into).collect(),
        total: page.total,
        limit: page.limit,
        offset: page.offset,
    }))
}

#[utoipa::path(get, path = "/api/admin/tenants/stats", tag = "Tenants", responses(
    (status = 200, body = TenantStatsResponse)
))]
pub async fn tenant_stats(
    State(ctx): State<AppContext>,
    bearer: Result<Bearer, StatusCode>,
) -> Result<Json<TenantStatsResponse>, ApiError> {
    require_superuser(&ctx, bearer).await?;
    let tenants = ctx.tenant_repo();
    let stats = TenantStats {
        tenants: tenants.as_ref(),
    }
    .execute(Utc::now())
    .await?;
    Ok(Json(TenantStatsResponse {
        total_tenants: stats.total_tenants,
        active_tenants: stats.active_tenants,
        suspended_tenants: stats.suspended_tenants,
        total_storage_mb: stats.total_storage_mb,
        total_users: stats.total_users,
        total_tournaments: stats.total_tournaments,
        tenants_by_plan: stats
            .tenants_by_plan
            .into_iter()
            .map(|(plan, n)| (plan.as_str().to_string(), n))
            .collect(),
        recent_signups: stats.recent_signups,
    }))
}

#[utoipa::path(get, path = "/api/admin/tenants/{id}", tag = "Tenants",
    params(("id" = i64, Path, description = "Tenant id")),
    responses((status = 200, body = TenantDetail), (status = 404)))]
pub async fn get_tenant(
    State(ctx): State<AppContext>,
    bearer: Result<Bearer, StatusCode>,
    Path(id): Path<i64>,
) -> Result<Json<TenantDetail>, ApiError> {
    require_superuser(&ctx, bearer).await?;
    Ok(Json(detail(&ctx, id).await?))
}

#[utoipa::path(post, path = "/api/admin/tenants", tag = "Tenants", request_body = CreateTenantBody, responses(
    (status = 201, body = TenantDetail),
    (status = 400, description = "Field errors")
))]
pub async fn create_tenant(
    State(ctx): State<AppContext>,
    bearer: Result<Bearer, StatusCode>,
    Json(body): Json<CreateTenantBody>,
) -> Result<(StatusCode, Json<TenantDetail>), ApiError> {
    require_superuser(&ctx, bearer).await?;
    let mut errors = FieldErrors::new();
    if body.schema_name.is_none() {
        errors.add("schema_name", REQUIRED);
    }
    if body.name.is_none() {
        errors.add("name", REQUIRED);
    }
    if body.owner_id.is_none() {
        errors.add("owner_id", REQUIRED);
    }
    if body.domain.is_none() {
        errors.add("domain", REQUIRED);
    }
    errors.into_result()?;

    let req = CreateTenantRequest {
        schema_name: body.schema_name.unwrap_or_default(),
        name: body.name.unwrap_or_default(),
        owner_id: body.owner_id.unwrap_or_default(),
        domain: body.domain.unwrap_or_default(),
        plan: body.plan,
        is_active: body.is_active,
    };
    let tenants = ctx.tenant_repo();
    let users = ctx.user_repo();
    let schemas = ctx.schemas();
    let tenant = CreateTenant {
        tenants: tenants.as_ref(),
        users: users.as_ref(),
        schemas: schemas.as_ref(),
    }
    .execute(&req)
    .await?;
    Ok((StatusCode::CREATED, Json(detail(&ctx, tenant.id).await?)))
}

#[utoipa::path(patch, path = "/api/admin/tenants/{id}", tag = "Tenants", request_body = UpdateTenantBody,
    params(("id" = i64, Path, description = "Tenant id")),
    responses((status = 200, body = TenantDetail), (status = 400), (status = 404)))]
pub async fn update_tenant(
    State(ctx): State<AppContext>,
    bearer: Result<Bearer, StatusCode>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTenantBody>,
) -> Result<Json<TenantDetail>, ApiError> {
    require_superuser(&ctx, bearer).await?;
    let tenants = ctx.tenant_repo();
    UpdateTenant {
        tenants: tenants.as_ref(),
    }
    .execute(
        id,
        &UpdateTenantRequest {
            name: body.name,
            is_active: body.is_active,
            plan: body.plan,
            notes: body.notes,
        },
    )
    .await?;
    Ok(Json(detail(&ctx, id).await?))
}

#[utoipa::path(post, path = "/api/admin/tenants/{id}/suspend", tag = "Tenants", request_body = SuspendBody,
    params(("id" = i64, Path, description = "Tenant id")),
    responses((status = 200, body = TenantDetail), (status = 400), (status = 404)))]
pub async fn suspend_tenant(
    State(ctx): State<AppContext>,
    bearer: Result<Bearer, StatusCode>,
    Path(id): Path<i64>,
    Json(body): Json<SuspendBody>,
) -> Result<Json<TenantDetail>, ApiError> {
    let admin = require_superuser(&ctx, bearer).await?;
    let suspend = body
        .suspend
        .ok_or_else(|| FieldErrors::single("suspend", REQUIRED))?;
    let tenants = ctx.tenant_repo();
    let cache = ctx.cache();
    SuspendTenant {
        tenants: tenants.as_ref(),
        cache: cache.as_ref(),
    }
    .execute(
        id,
        &SuspendTenantRequest {
            suspend,
            reason: body.reason,
        },
    )
    .await?;
    tracing::debug!(admin_id = admin.id, tenant_id = id, "tenant_suspension_changed");
    Ok(Json(detail(&ctx, id).await?))
}

#[utoipa::path(post, path = "/api/admin/tenants/{id}/refresh-usage", tag = "Tenants",
    params(("id" = i64, Path, description = "Tenant id")),
    responses((status = 200, body = TenantDetail), (status = 404)))]
pub async fn refresh_usage(
    State(ctx): State<AppContext>,
    bearer: Result<Bearer, StatusCode>,
    Path(id): Path<i64>,
) -> Result<Json<TenantDetail>, ApiError> {
    require_superuser(&ctx, bearer).await?;
    let tenants = ctx.tenant_repo();
    let schemas = ctx.schemas();
    RefreshUsage {
        tenants: tenants.as_ref(),
        schemas: schemas.as_ref(),
        limits: &ctx.cfg.tenancy.limits,
    }
    .execute(id)
    .await?;
    Ok(Json(detail(&ctx, id).await?))
}

#[utoipa::path(post, path = "/api/admin/impersonate", tag = "Tenants", request_body = ImpersonateBody, responses(
    (status = 200, body = ImpersonationResponse),
    (status = 400, description = "Field errors")
))]
pub async fn impersonate(
    State(ctx): State<AppContext>,
    bearer: Result<Bearer, StatusCode>,
    Json(body): Json<ImpersonateBody>,
) -> Result<Json<ImpersonationResponse>, ApiError> {
    let admin = require_superuser(&ctx, bearer).await?;
    let tenant_id = body
        .tenant_id
        .ok_or_else(|| FieldErrors::single("tenant_id", REQUIRED))?;
    let tenants = ctx.tenant_repo();
    let users = ctx.user_repo();
    let grant = Impersonate {
        tenants: tenants.as_ref(),
        users: users.as_ref(),
    }
    .execute(admin.id, tenant_id)
    .await?;
    let token = impersonation_token(&ctx.cfg, &grant, Utc::now())?;
    Ok(Json(ImpersonationResponse {
        token,
        token_type: "impersonation",
        expires_in: IMPERSONATION_TTL_SECS,
        tenant_id: grant.tenant.id,
        schema_name: grant.tenant.schema_name,
        owner_username: grant.owner.username,
    }))
}

pub fn impersonation_token(
    cfg: &Config,
    grant: &ImpersonationGrant,
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    let iat = now.timestamp().max(0) as usize;
    let claims = ImpersonationClaims {
        sub: grant.owner.id.to_string(),
        tenant_id: grant.tenant.id,
        schema_name: grant.tenant.schema_name.clone(),
        impersonator: grant.impersonator_id,
        token_type: "impersonation".into(),
        iat,
        exp: iat + IMPERSONATION_TTL_SECS as usize,
    };
    Ok(jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.secret_key.expose().as_bytes()),
    )?)
}

#[utoipa::path(get, path = "/api/tenant", tag = "Tenants", security(()), responses(
    (status = 200, body = TenantLookupResponse),
    (status = 404)
))]
pub async fn current_tenant(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<TenantLookupResponse>, ApiError> {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::NOT_FOUND)?;
    let tenants = ctx.tenant_repo();
    let cache = ctx.cache();
    let tenant = ResolveTenant {
        tenants: tenants.as_ref(),
        cache: cache.as_ref(),
        base_domain: &ctx.cfg.tenancy.base_domain,
        admin_subdomain: &ctx.cfg.tenancy.admin_subdomain,
    }
    .by_host(host)
    .await?
    .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(TenantLookupResponse {
        id: tenant.id,
        name: tenant.name,
        schema_name: tenant.schema_name,
        plan: tenant.plan,
    }))
}
