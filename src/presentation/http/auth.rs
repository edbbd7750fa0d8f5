use crate::application::ports::user_repository::UserRow;
use crate::application::use_cases::auth::login::{Login as LoginUc, LoginRequest as LoginDto};
use crate::application::use_cases::auth::me::GetMe;
use crate::application::use_cases::auth::register::{
    Register as RegisterUc, RegisterRequest as RegisterDto,
};
use crate::application::use_cases::auth::rename_user::RenameUser;
use crate::application::use_cases::tenants::provision_tenant::ProvisionTenant;
use crate::application::validation::FieldErrors;
use crate::bootstrap::app_context::AppContext;
use crate::bootstrap::config::Config;
use crate::presentation::http::error::ApiError;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const MAX_USERNAME_LEN: usize = 150;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<UserRow> for UserResponse {
    fn from(u: UserRow) -> Self {
        UserResponse {
            id: u.id,
            username: u.username,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            is_superuser: u.is_superuser,
            date_joined: u.date_joined,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RenameRequest {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me).patch(rename_me))
        .with_state(ctx)
}

fn validate_username(username: &str, errors: &mut FieldErrors) {
    if username.trim().is_empty() {
        errors.add("username", "This field may not be blank.");
    } else if username.chars().count() > MAX_USERNAME_LEN {
        errors.add(
            "username",
            format!("Ensure this field has no more than {MAX_USERNAME_LEN} characters."),
        );
    }
}

async fn ensure_username_free(ctx: &AppContext, username: &str) -> Result<(), ApiError> {
    if ctx.user_repo().find_by_username(username).await?.is_some() {
        return Err(FieldErrors::single("username", "A user with that username already exists.").into());
    }
    Ok(())
}

#[utoipa::path(post, path = "/api/auth/register", tag = "Auth", request_body = RegisterRequest, security(()), responses(
    (status = 200, body = UserResponse),
    (status = 400, description = "Field errors")
))]
pub async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let mut errors = FieldErrors::new();
    validate_username(&req.username, &mut errors);
    if req.password.is_empty() {
        errors.add("password", "This field may not be blank.");
    }
    errors.into_result()?;
    let username = req.username.trim();
    ensure_username_free(&ctx, username).await?;

    let repo = ctx.user_repo();
    let tenants = ctx.tenant_repo();
    let schemas = ctx.schemas();
    let uc = RegisterUc {
        repo: repo.as_ref(),
        provision: ProvisionTenant {
            tenants: tenants.as_ref(),
            schemas: schemas.as_ref(),
            base_domain: &ctx.cfg.tenancy.base_domain,
        },
    };
    let dto = RegisterDto {
        username: username.to_string(),
        email: req.email.trim().to_string(),
        first_name: req.first_name,
        last_name: req.last_name,
        password: req.password,
        is_superuser: false,
    };
    let user = uc.execute(&dto).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(post, path = "/api/auth/login", tag = "Auth", request_body = LoginRequest, security(()), responses(
    (status = 200, body = LoginResponse)
))]
pub async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, StatusCode> {
    let repo = ctx.user_repo();
    let uc = LoginUc {
        repo: repo.as_ref(),
    };
    let dto = LoginDto {
        username: req.username.trim().to_string(),
        password: req.password,
    };
    let user = uc
        .execute(&dto)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let token = issue_token(&ctx.cfg, user.id).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(LoginResponse {
        access_token: token,
        user: user.into(),
    }))
}

#[utoipa::path(get, path = "/api/auth/me", tag = "Auth", responses((status = 200, body = UserResponse)))]
pub async fn me(
    State(ctx): State<AppContext>,
    bearer: Result<Bearer, StatusCode>,
) -> Result<Json<UserResponse>, StatusCode> {
    let user = authenticate(&ctx, bearer?).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(patch, path = "/api/auth/me", tag = "Auth", request_body = RenameRequest, responses(
    (status = 200, body = UserResponse),
    (status = 400, description = "Field errors")
))]
pub async fn rename_me(
    State(ctx): State<AppContext>,
    bearer: Result<Bearer, StatusCode>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = authenticate(&ctx, bearer?).await?;
    let mut errors = FieldErrors::new();
    validate_username(&req.username, &mut errors);
    errors.into_result()?;
    let username = req.username.trim();
    if username == user.username {
        return Ok(Json(user.into()));
    }
    ensure_username_free(&ctx, username).await?;

    let repo = ctx.user_repo();
    let tenants = ctx.tenant_repo();
    let uc = RenameUser {
        repo: repo.as_ref(),
        tenants: tenants.as_ref(),
    };
    let renamed = uc
        .execute(user.id, username)
        .await?
        .ok_or(ApiError::Status(StatusCode::UNAUTHORIZED))?;
    Ok(Json(renamed.into()))
}

// --- Bearer extractor & JWT utils ---
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

pub struct Bearer(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Bearer
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|auth| auth.strip_prefix("Bearer "))
            .map(|t| Bearer(t.trim().to_string()))
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

pub fn issue_token(cfg: &Config, user_id: i64) -> anyhow::Result<String> {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + cfg.jwt_expires_secs.max(0) as usize,
        token_type: None,
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.secret_key.expose().as_bytes()),
    )?;
    Ok(token)
}

pub(crate) fn validate_bearer(cfg: &Config, bearer: Bearer) -> Result<i64, StatusCode> {
    let data = jsonwebtoken::decode::<Claims>(
        &bearer.0,
        &DecodingKey::from_secret(cfg.secret_key.expose().as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;
    data.claims
        .sub
        .parse::<i64>()
        .map_err(|_| StatusCode::UNAUTHORIZED)
}

/// Resolves the bearer token to a live user row.
pub(crate) async fn authenticate(ctx: &AppContext, bearer: Bearer) -> Result<UserRow, StatusCode> {
    let id = validate_bearer(&ctx.cfg, bearer)?;
    let repo = ctx.user_repo();
    let uc = GetMe {
        repo: repo.as_ref(),
    };
    uc.execute(id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)
}

/// 401 without a valid token, 403 for anyone but a superuser.
pub(crate) async fn require_superuser(
    ctx: &AppContext,
    bearer: Result<Bearer, StatusCode>,
) -> Result<UserRow, StatusCode> {
    let user = authenticate(ctx, bearer?).await?;
    if !user.is_superuser {
        tracing::warn!(user_id = user.id, "admin_access_denied");
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(user)
}
