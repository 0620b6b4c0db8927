//! Application error type.

use crate::commerce::CommerceError;
use crate::config::ConfigError;
use crate::validation::ValidationErrors;

/// Top-level error for storefront operations.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Commerce(#[from] CommerceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("validation failed")]
    Validation(#[from] ValidationErrors),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
