use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;

pub const WORKER_OK_BODY: &str = "Tabbycat Worker: Running\n";
pub const NOT_FOUND_BODY: &str = "Not Found\n";

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResp {
    pub status: &'static str,
}

/// API liveness for the platform health check; reports `degraded` when the
/// database does not answer.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, body = HealthResp))
)]
pub async fn health(State(pool): State<PgPool>) -> Json<HealthResp> {
    let db_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&pool)
        .await
        .is_ok();
    let status = if db_ok { "ok" } else { "degraded" };
    Json(HealthResp { status })
}

pub fn routes(pool: PgPool) -> Router {
    Router::new().route("/health", get(health)).with_state(pool)
}

async fn worker_health() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        WORKER_OK_BODY,
    )
}

async fn worker_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain")],
        NOT_FOUND_BODY,
    )
}

/// Liveness endpoint served next to the queue worker. No request logging.
pub fn worker_routes() -> Router {
    Router::new()
        .route("/health", get(worker_health))
        .fallback(worker_not_found)
}
