//! Authentication service.
//!
//! Owns the `users` table: password registration and verification, password
//! changes, the optional TOTP secret, and the login state machine over a
//! [`RequestContext`].

mod error;
pub mod policy;

pub use error::AuthError;
pub use policy::{WeakPasswordError, passwords_match, validate_password};

use std::sync::LazyLock;
use std::time::SystemTime;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use bookshelf_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::{UserRecord, UserRepository};
use crate::models::{CurrentUser, RequestContext, User};
use crate::services::two_factor::{Enrollment, TotpSecret, TwoFactor};

/// Hash verified against when the email is unknown, so both failure paths
/// cost one Argon2 verification.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("unused-dummy-password").ok());

/// Result of a successful password check during login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    /// No second factor configured; the context is now authenticated.
    Authenticated,
    /// The context is pending a TOTP code.
    SecondFactorRequired,
}

/// A password-change form submission.
#[derive(Debug, Clone, Copy)]
pub struct PasswordChange<'a> {
    /// Current password, re-checked before anything changes.
    pub old_password: &'a str,
    /// Replacement password, subject to the composition rules.
    pub new_password: &'a str,
    /// Persist the enrollment secret held in the context (`true`) or clear
    /// any stored secret (`false`).
    pub enable_two_factor: bool,
}

/// Authentication service.
///
/// Each operation runs in its own transaction on `pool`.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    two_factor: &'a TwoFactor,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, two_factor: &'a TwoFactor) -> Self {
        Self { pool, two_factor }
    }

    // =========================================================================
    // Credential Store
    // =========================================================================

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::DuplicateEmail` if the email is already registered.
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserId, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let mut tx = self.pool.begin().await?;
        let id = UserRepository::new(&mut *tx)
            .insert(name, &email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::DuplicateEmail,
                other => AuthError::Repository(other),
            })?;
        tx.commit().await?;

        debug!(user_id = %id, "user registered");
        Ok(id)
    }

    /// Check an email/password pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownUser` if the email is unknown or malformed,
    /// or if the password does not match. The caller cannot tell which.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let mut tx = self.pool.begin().await?;
        let record = check_credentials(&mut *tx, email, password).await?;
        tx.commit().await?;

        Ok(record.to_user()?)
    }

    /// Replace a user's password after re-checking the old one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownUser` if the old credentials do not verify.
    /// Returns `AuthError::WeakPassword` if the new password is rejected.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        email: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let mut tx = self.pool.begin().await?;
        let record = check_credentials(&mut *tx, email, old_password).await?;
        validate_password(new_password)?;
        let password_hash = hash_password(new_password)?;
        UserRepository::new(&mut *tx)
            .update_password_hash(record.id, &password_hash)
            .await?;
        tx.commit().await?;

        debug!(user_id = %record.id, "password changed");
        Ok(())
    }

    /// Store or clear a user's TOTP secret.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownUser` if no user has this ID.
    #[instrument(skip_all, fields(user_id = %user))]
    pub async fn set_two_factor_secret(
        &self,
        user: UserId,
        secret: Option<&TotpSecret>,
    ) -> Result<(), AuthError> {
        let mut tx = self.pool.begin().await?;
        let updated = UserRepository::new(&mut *tx)
            .set_totp(user, secret.map(TotpSecret::as_base32))
            .await?;
        if !updated {
            return Err(AuthError::UnknownUser);
        }
        tx.commit().await?;

        debug!(enabled = secret.is_some(), "two-factor secret updated");
        Ok(())
    }

    /// Whether the user has a TOTP secret stored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownUser` if no user has this ID.
    pub async fn two_factor_enabled(&self, user: UserId) -> Result<bool, AuthError> {
        Ok(self.stored_secret(user).await?.is_some())
    }

    /// The user's stored TOTP secret.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TwoFactorNotConfigured` if none is stored.
    /// Returns `AuthError::UnknownUser` if no user has this ID.
    pub async fn two_factor_secret(&self, user: UserId) -> Result<TotpSecret, AuthError> {
        self.stored_secret(user)
            .await?
            .ok_or(AuthError::TwoFactorNotConfigured)
    }

    async fn stored_secret(&self, user: UserId) -> Result<Option<TotpSecret>, AuthError> {
        let mut tx = self.pool.begin().await?;
        let record = UserRepository::new(&mut *tx)
            .find_by_id(user)
            .await?
            .ok_or(AuthError::UnknownUser)?;
        tx.commit().await?;

        Ok(record.totp.map(TotpSecret::from_base32))
    }

    // =========================================================================
    // Login Flow
    // =========================================================================

    /// First login step: check the password and advance `ctx`.
    ///
    /// On failure `ctx` is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownUser` on bad credentials.
    #[instrument(skip_all)]
    pub async fn login(
        &self,
        ctx: &mut RequestContext,
        email: &str,
        password: &str,
    ) -> Result<LoginStep, AuthError> {
        let mut tx = self.pool.begin().await?;
        let record = check_credentials(&mut *tx, email, password).await?;
        tx.commit().await?;

        let user = CurrentUser::from(record.to_user()?);
        ctx.enrollment_secret = None;

        if record.totp.is_some() {
            debug!(user_id = %user.id, "second factor required");
            ctx.await_second_factor(user);
            Ok(LoginStep::SecondFactorRequired)
        } else {
            debug!(user_id = %user.id, "logged in");
            ctx.authenticate(user);
            Ok(LoginStep::Authenticated)
        }
    }

    /// Second login step: check a TOTP code for the pending user.
    ///
    /// A wrong code leaves `ctx` pending so the user can retry. If the
    /// user's secret has disappeared since the password step, `ctx` is reset
    /// to anonymous.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidSessionState` if `ctx` is not pending.
    /// Returns `AuthError::InvalidTwoFactorCode` if the code does not match.
    /// Returns `AuthError::TwoFactorNotConfigured` if the secret was cleared.
    #[instrument(skip_all)]
    pub async fn verify_second_factor(
        &self,
        ctx: &mut RequestContext,
        code: &str,
        at: SystemTime,
    ) -> Result<(), AuthError> {
        let pending = ctx
            .pending_user()
            .cloned()
            .ok_or(AuthError::InvalidSessionState)?;

        let secret = match self.stored_secret(pending.id).await {
            Ok(Some(secret)) => secret,
            Ok(None) => {
                ctx.logout();
                return Err(AuthError::TwoFactorNotConfigured);
            }
            Err(AuthError::UnknownUser) => {
                ctx.logout();
                return Err(AuthError::UnknownUser);
            }
            Err(e) => return Err(e),
        };

        if !self.two_factor.verify(&secret, code, at)? {
            debug!(user_id = %pending.id, "second factor rejected");
            return Err(AuthError::InvalidTwoFactorCode);
        }

        debug!(user_id = %pending.id, "logged in with second factor");
        ctx.authenticate(pending);
        Ok(())
    }

    /// Generate a candidate TOTP secret for the logged-in user.
    ///
    /// The secret is only held in `ctx`; nothing is written until a
    /// password change opts in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidSessionState` if `ctx` is not authenticated.
    pub fn begin_enrollment(&self, ctx: &mut RequestContext) -> Result<Enrollment, AuthError> {
        let user = ctx.current_user().ok_or(AuthError::InvalidSessionState)?;
        let secret = TwoFactor::generate_secret();
        let provisioning_uri = self
            .two_factor
            .provisioning_uri(&secret, user.email.as_str());

        ctx.enrollment_secret = Some(secret.clone());
        Ok(Enrollment {
            secret,
            provisioning_uri,
        })
    }

    /// Change the logged-in user's password and toggle two-factor in one
    /// transaction.
    ///
    /// On success the enrollment secret is removed from `ctx`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidSessionState` if `ctx` is not authenticated.
    /// Returns `AuthError::TwoFactorNotConfigured` if opting in without an
    /// enrollment secret.
    /// Returns `AuthError::UnknownUser` if the old password is wrong.
    /// Returns `AuthError::WeakPassword` if the new password is rejected.
    #[instrument(skip_all)]
    pub async fn submit_password_change(
        &self,
        ctx: &mut RequestContext,
        change: PasswordChange<'_>,
    ) -> Result<(), AuthError> {
        let user = ctx
            .current_user()
            .cloned()
            .ok_or(AuthError::InvalidSessionState)?;
        let secret = if change.enable_two_factor {
            Some(
                ctx.enrollment_secret
                    .clone()
                    .ok_or(AuthError::TwoFactorNotConfigured)?,
            )
        } else {
            None
        };

        let mut tx = self.pool.begin().await?;
        let record = check_credentials(&mut *tx, user.email.as_str(), change.old_password).await?;
        validate_password(change.new_password)?;
        let password_hash = hash_password(change.new_password)?;

        let mut users = UserRepository::new(&mut *tx);
        users.update_password_hash(record.id, &password_hash).await?;
        users
            .set_totp(record.id, secret.as_ref().map(TotpSecret::as_base32))
            .await?;
        tx.commit().await?;

        ctx.enrollment_secret = None;
        debug!(
            user_id = %record.id,
            two_factor = secret.is_some(),
            "password changed"
        );
        Ok(())
    }
}

/// Look up `email` and verify `password` against its hash.
async fn check_credentials(
    conn: &mut PgConnection,
    email: &str,
    password: &str,
) -> Result<UserRecord, AuthError> {
    let record = match Email::parse(email) {
        Ok(email) => UserRepository::new(conn).find_by_email(&email).await?,
        Err(_) => None,
    };

    let Some(record) = record else {
        if let Some(dummy) = DUMMY_HASH.as_deref() {
            let _ = verify_password(password, dummy);
        }
        return Err(AuthError::UnknownUser);
    };

    verify_password(password, &record.password_hash)?;
    Ok(record)
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::UnknownUser)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::UnknownUser)
}
