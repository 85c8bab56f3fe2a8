//! User repository for database operations.
//!
//! Only the credential store uses this module; `password_hash` and `totp`
//! are never exposed outside it.

use sqlx::PgConnection;

use bookshelf_core::{Email, UserId};

use super::RepositoryError;
use crate::models::User;

/// A `users` row including secret columns.
#[derive(sqlx::FromRow)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub totp: Option<String>,
}

impl UserRecord {
    /// Public identity for this row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub fn to_user(&self) -> Result<User, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(User {
            id: self.id,
            name: self.name.clone(),
            email,
        })
    }
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("totp", &self.totp.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Repository for user database operations.
pub struct UserRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> UserRepository<'c> {
    /// Create a repository on a connection (usually an open transaction).
    #[must_use]
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(
        &mut self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<UserId, RepositoryError> {
        let (id,): (UserId,) = sqlx::query_as(
            r"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| RepositoryError::from_write(e, "email already exists"))?;

        Ok(id)
    }

    /// Get a user row (with secrets) by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_email(
        &mut self,
        email: &Email,
    ) -> Result<Option<UserRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r"
            SELECT id, name, email, password_hash, totp
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(record)
    }

    /// Get a user row (with secrets) by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_id(&mut self, id: UserId) -> Result<Option<UserRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r"
            SELECT id, name, email, password_hash, totp
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(record)
    }

    /// Overwrite a user's password hash.
    ///
    /// Returns `false` if no row matched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_password_hash(
        &mut self,
        id: UserId,
        password_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set or clear a user's TOTP secret.
    ///
    /// Returns `false` if no row matched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_totp(
        &mut self,
        id: UserId,
        secret: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE users SET totp = $1 WHERE id = $2")
            .bind(secret)
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of registered users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&mut self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }
}
