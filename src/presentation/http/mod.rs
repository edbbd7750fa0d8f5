use axum::Router;

use crate::bootstrap::app_context::AppContext;

pub mod auth;
pub mod error;
pub mod health;
pub mod tenants;

/// Every `/api` route except the database health check.
pub fn api_router(ctx: AppContext) -> Router {
    Router::new()
        .nest("/api/auth", auth::routes(ctx.clone()))
        .nest("/api/admin", tenants::admin_routes(ctx.clone()))
        .merge(tenants::lookup_routes(ctx))
}
