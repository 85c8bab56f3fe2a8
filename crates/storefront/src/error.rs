//! Error taxonomy shared by every storefront service.
//!
//! Each service has its own error enum; all of them map onto one
//! [`ErrorKind`] so the web layer can pick a response (flash message,
//! redirect, status code) without matching on every variant.

use thiserror::Error;

use crate::config::ConfigError;
use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::catalog::CatalogError;
use crate::services::two_factor::TwoFactorError;
use crate::services::uploads::UploadError;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input: weak password, malformed email, rejected upload, wrong code.
    Validation,
    /// The entity (or an unknown/invalid credential) does not exist.
    NotFound,
    /// A uniqueness constraint rejected the write.
    Conflict,
    /// Missing configuration or a required secret is absent.
    Configuration,
    /// Any other storage failure.
    TransientStore,
}

impl RepositoryError {
    /// Taxonomy bucket for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Database(_) | Self::DataCorruption(_) => ErrorKind::TransientStore,
        }
    }
}

/// Any storefront failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Two-factor error: {0}")]
    TwoFactor(#[from] TwoFactorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),
}

impl Error {
    /// Taxonomy bucket for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(e) => e.kind(),
            Self::Catalog(e) => e.kind(),
            Self::Upload(e) => e.kind(),
            Self::TwoFactor(e) => e.kind(),
            Self::Config(e) => e.kind(),
            Self::Database(e) => e.kind(),
        }
    }
}

/// Result type alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
