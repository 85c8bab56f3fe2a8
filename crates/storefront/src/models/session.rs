//! Request-scoped authentication state.
//!
//! The web layer owns persistence of this value (cookie or server-side
//! session) and passes it into every auth operation. Nothing in this crate
//! keeps it between requests.
//!
//! Login moves through three states:
//!
//! ```text
//! Anonymous --password ok, 2FA off--> Authenticated
//! Anonymous --password ok, 2FA on---> PendingSecondFactor --valid code--> Authenticated
//!                                     PendingSecondFactor --bad code----> PendingSecondFactor
//! ```

use serde::{Deserialize, Serialize};

use bookshelf_core::{Email, UserId};

use crate::models::User;
use crate::services::two_factor::TotpSecret;

/// Minimal identity kept in the session for a logged-in (or half logged-in) user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's display name.
    pub name: String,
    /// User's email address.
    pub email: Email,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

/// Where the current request stands in the login flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "user", rename_all = "snake_case")]
pub enum AuthState {
    /// No credentials have been accepted.
    #[default]
    Anonymous,
    /// Password accepted; a TOTP code is still required.
    PendingSecondFactor(CurrentUser),
    /// Fully logged in.
    Authenticated(CurrentUser),
}

/// Authentication carrier for a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Login state.
    pub auth: AuthState,
    /// Candidate TOTP secret shown during enrollment, not yet persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment_secret: Option<TotpSecret>,
}

impl RequestContext {
    /// A fresh anonymous context.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The fully authenticated user, if any.
    #[must_use]
    pub const fn current_user(&self) -> Option<&CurrentUser> {
        match &self.auth {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// The user waiting on a second factor, if any.
    #[must_use]
    pub const fn pending_user(&self) -> Option<&CurrentUser> {
        match &self.auth {
            AuthState::PendingSecondFactor(user) => Some(user),
            _ => None,
        }
    }

    /// Whether the request is fully logged in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated(_))
    }

    pub(crate) fn authenticate(&mut self, user: CurrentUser) {
        self.auth = AuthState::Authenticated(user);
    }

    pub(crate) fn await_second_factor(&mut self, user: CurrentUser) {
        self.auth = AuthState::PendingSecondFactor(user);
    }

    /// Drop back to anonymous and forget any enrollment candidate.
    pub fn logout(&mut self) {
        self.auth = AuthState::Anonymous;
        self.enrollment_secret = None;
    }
}
