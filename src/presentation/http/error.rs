use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::application::use_cases::tenants::error::TenantAdminError;
use crate::application::validation::FieldErrors;

/// Handler error: a bare status, or 400 with field-keyed messages.
#[derive(Debug)]
pub enum ApiError {
    Status(StatusCode),
    Validation(FieldErrors),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Status(code) => code.into_response(),
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
        }
    }
}

impl From<StatusCode> for ApiError {
    fn from(code: StatusCode) -> Self {
        ApiError::Status(code)
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!(error = ?e, "request_failed");
        ApiError::Status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<TenantAdminError> for ApiError {
    fn from(e: TenantAdminError) -> Self {
        match e {
            TenantAdminError::Validation(errors) => ApiError::Validation(errors),
            TenantAdminError::NotFound => ApiError::Status(StatusCode::NOT_FOUND),
            TenantAdminError::Internal(e) => e.into(),
        }
    }
}
