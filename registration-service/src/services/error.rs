use crate::token::TokenError;
use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("invalid or expired token: {0}")]
    Token(#[from] TokenError),

    #[error("directory error: {0}")]
    Directory(anyhow::Error),

    #[error("email error: {0}")]
    Email(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            // Token failures stay generic towards the caller; the specific
            // check that failed is only logged.
            ServiceError::Token(_) => {
                AppError::BadRequest(anyhow::anyhow!("Invalid or expired link"))
            }
            ServiceError::Directory(e) => AppError::DirectoryError(e),
            ServiceError::Email(e) => AppError::EmailError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
