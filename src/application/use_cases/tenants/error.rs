use crate::application::validation::FieldErrors;

#[derive(thiserror::Error, Debug)]
pub enum TenantAdminError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error("tenant not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<FieldErrors> for TenantAdminError {
    fn from(errors: FieldErrors) -> Self {
        TenantAdminError::Validation(errors)
    }
}
