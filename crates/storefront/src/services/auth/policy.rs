//! Password composition rules.
//!
//! Checked in order, first failure wins:
//!
//! 1. at least [`MIN_PASSWORD_LENGTH`] characters;
//! 2. every character is an ASCII lowercase letter, ASCII uppercase letter,
//!    ASCII digit, or one of [`SPECIAL_CHARACTERS`]; anything else (space,
//!    accented letter, emoji...) is rejected outright;
//! 3. all four classes are present.

use thiserror::Error;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 12;

/// The only non-alphanumeric characters a password may contain.
pub const SPECIAL_CHARACTERS: &str = "(~`!@#$%^&*()_-+={[}]|:;\"'<,>.?/)";

/// Why a password was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WeakPasswordError {
    #[error("password must be at least {min} characters")]
    TooShort { min: usize },

    #[error("password contains a character that is not allowed")]
    InvalidCharacter,

    #[error("password must contain a lowercase letter, an uppercase letter, a digit and a special character")]
    MissingClass,
}

#[derive(Default)]
struct Classes {
    lower: bool,
    upper: bool,
    digit: bool,
    special: bool,
}

impl Classes {
    const fn all(&self) -> bool {
        self.lower && self.upper && self.digit && self.special
    }
}

/// Check `password` against the composition rules.
///
/// # Errors
///
/// Returns the first [`WeakPasswordError`] rule the password breaks.
pub fn validate_password(password: &str) -> Result<(), WeakPasswordError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(WeakPasswordError::TooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }

    let mut seen = Classes::default();
    for c in password.chars() {
        match c {
            'a'..='z' => seen.lower = true,
            'A'..='Z' => seen.upper = true,
            '0'..='9' => seen.digit = true,
            c if SPECIAL_CHARACTERS.contains(c) => seen.special = true,
            _ => return Err(WeakPasswordError::InvalidCharacter),
        }
    }

    if seen.all() {
        Ok(())
    } else {
        Err(WeakPasswordError::MissingClass)
    }
}

/// Whether a password and its confirmation field agree.
#[must_use]
pub fn passwords_match(password: &str, confirmation: &str) -> bool {
    password == confirmation
}
