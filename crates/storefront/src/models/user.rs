//! User domain types.
//!
//! The password hash and TOTP secret never leave the credential store; the
//! public [`User`] carries identity only.

use serde::{Deserialize, Serialize};

use bookshelf_core::{Email, UserId};

/// An authenticated site user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name given at registration.
    pub name: String,
    /// Login email (unique across users).
    pub email: Email,
}
