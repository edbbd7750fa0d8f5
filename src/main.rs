use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use tabhost::application::ports::cache_port::CachePort;
use tabhost::application::use_cases::auth::ensure_superuser::EnsureSuperuser;
use tabhost::application::use_cases::auth::register::Register;
use tabhost::application::use_cases::tenants::provision_tenant::ProvisionTenant;
use tabhost::bootstrap::app_context::{AppContext, AppServices};
use tabhost::bootstrap::config::{Config, CorsSettings};
use tabhost::bootstrap::telemetry;
use tabhost::infrastructure::cache::{NoopCache, redis_cache::RedisCache};
use tabhost::infrastructure::db::{
    self, repositories::tenant_repository_sqlx::SqlxTenantRepository,
    repositories::user_repository_sqlx::SqlxUserRepository,
    schema_provisioner_pg::PgSchemaProvisioner,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
        paths(
            tabhost::presentation::http::auth::register,
            tabhost::presentation::http::auth::login,
            tabhost::presentation::http::auth::me,
            tabhost::presentation::http::auth::rename_me,
            tabhost::presentation::http::tenants::list_tenants,
            tabhost::presentation::http::tenants::tenant_stats,
            tabhost::presentation::http::tenants::get_tenant,
            tabhost::presentation::http::tenants::create_tenant,
            tabhost::presentation::http::tenants::update_tenant,
            tabhost::presentation::http::tenants::suspend_tenant,
            tabhost::presentation::http::tenants::refresh_usage,
            tabhost::presentation::http::tenants::impersonate,
            tabhost::presentation::http::tenants::current_tenant,
            tabhost::presentation::http::health::health,
        ),
        components(schemas(
            tabhost::presentation::http::auth::RegisterRequest,
            tabhost::presentation::http::auth::LoginRequest,
            tabhost::presentation::http::auth::LoginResponse,
            tabhost::presentation::http::auth::RenameRequest,
            tabhost::presentation::http::auth::UserResponse,
            tabhost::presentation::http::tenants::TenantListItem,
            tabhost::presentation::http::tenants::TenantPage,
            tabhost::presentation::http::tenants::OwnerSummary,
            tabhost::presentation::http::tenants::DomainItem,
            tabhost::presentation::http::tenants::TenantDetail,
            tabhost::presentation::http::tenants::TenantStatsResponse,
            tabhost::presentation::http::tenants::CreateTenantBody,
            tabhost::presentation::http::tenants::UpdateTenantBody,
            tabhost::presentation::http::tenants::SuspendBody,
            tabhost::presentation::http::tenants::ImpersonateBody,
            tabhost::presentation::http::tenants::ImpersonationResponse,
            tabhost::presentation::http::tenants::TenantLookupResponse,
            tabhost::domain::tenants::tenant::Plan,
            tabhost::domain::tenants::tenant::TenantStatus,
            tabhost::presentation::http::health::HealthResp,
        )),
        tags(
            (name = "Auth", description = "Authentication"),
            (name = "Tenants", description = "Tenant administration and host lookup"),
            (name = "Health", description = "System health checks")
        )
    )]
struct ApiDoc;

fn cors_layer(cors: &CorsSettings) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    if cors.allow_all {
        return base.allow_origin(AllowOrigin::mirror_request());
    }
    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "cors_origin_invalid");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let cfg = Config::from_env()?;
    telemetry::init(telemetry::DEFAULT_FILTER, &cfg.error_reporting);
    info!(?cfg, "Starting tabhost API");

    // Database
    let pool = db::connect_pool(&cfg.database).await?;
    db::migrate(&pool).await?;

    let user_repo = Arc::new(SqlxUserRepository::new(pool.clone()));
    let tenant_repo = Arc::new(SqlxTenantRepository::new(pool.clone()));
    let schemas = Arc::new(PgSchemaProvisioner::new(pool.clone()));
    let cache: Arc<dyn CachePort> = match &cfg.redis {
        Some(redis) => {
            info!("cache_backend_redis");
            Arc::new(RedisCache::new(redis)?)
        }
        None => {
            info!("cache_backend_none");
            Arc::new(NoopCache)
        }
    };

    if let Some(su) = &cfg.superuser {
        EnsureSuperuser {
            register: Register {
                repo: user_repo.as_ref(),
                provision: ProvisionTenant {
                    tenants: tenant_repo.as_ref(),
                    schemas: schemas.as_ref(),
                    base_domain: &cfg.tenancy.base_domain,
                },
            },
        }
        .execute(&su.username, &su.email, su.password.expose())
        .await?;
    }

    let services = AppServices::new(user_repo, tenant_repo, schemas, cache);
    let ctx = AppContext::new(cfg.clone(), services);

    let app = Router::new()
        .merge(tabhost::presentation::http::api_router(ctx))
        .nest("/api", tabhost::presentation::http::health::routes(pool.clone()))
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(&cfg.cors))
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!(%addr, base_domain = %cfg.tenancy.base_domain, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
