//! Authentication error types.

use thiserror::Error;

use bookshelf_core::EmailError;

use super::policy::WeakPasswordError;
use crate::db::RepositoryError;
use crate::error::ErrorKind;
use crate::services::two_factor::TwoFactorError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format (registration only; login folds this into
    /// [`AuthError::UnknownUser`]).
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// No such user, or the password did not verify. The two cases are
    /// deliberately the same variant.
    #[error("unknown user")]
    UnknownUser,

    /// Email already registered.
    #[error("email already registered")]
    DuplicateEmail,

    /// Password rejected by the composition rules.
    #[error("weak password: {0}")]
    WeakPassword(#[from] WeakPasswordError),

    /// The user has no TOTP secret, or opted in without an enrollment secret.
    #[error("two-factor authentication is not configured")]
    TwoFactorNotConfigured,

    /// The submitted TOTP code did not match.
    #[error("invalid two-factor code")]
    InvalidTwoFactorCode,

    /// The request context is not in the state this operation requires.
    #[error("invalid session state")]
    InvalidSessionState,

    /// TOTP computation failed.
    #[error("two-factor error: {0}")]
    TwoFactor(#[from] TwoFactorError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Taxonomy bucket for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidEmail(_)
            | Self::WeakPassword(_)
            | Self::InvalidTwoFactorCode
            | Self::InvalidSessionState => ErrorKind::Validation,
            Self::UnknownUser => ErrorKind::NotFound,
            Self::DuplicateEmail => ErrorKind::Conflict,
            Self::TwoFactorNotConfigured => ErrorKind::Configuration,
            Self::TwoFactor(e) => e.kind(),
            Self::Repository(e) => e.kind(),
            Self::PasswordHash => ErrorKind::TransientStore,
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}
