//! Time-based one-time passwords (RFC 6238) for the optional second factor.
//!
//! Codes are 6 digits over 30-second steps with HMAC-SHA1, which is what
//! every mainstream authenticator app expects. Secrets are 160 random bits,
//! base32-encoded without padding.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::config::TwoFactorConfig;
use crate::error::ErrorKind;

/// Number of digits in a code.
pub const CODE_DIGITS: usize = 6;

/// Length of one time step in seconds.
pub const STEP_SECONDS: u64 = 30;

/// Raw secret length in bytes (160 bits).
const SECRET_BYTES: usize = 20;

/// Errors from the two-factor verifier.
#[derive(Debug, Error)]
pub enum TwoFactorError {
    /// The stored secret is not valid base32 or is shorter than 128 bits.
    #[error("invalid TOTP secret")]
    InvalidSecret,

    /// The supplied time is before the Unix epoch.
    #[error("system clock is before the Unix epoch")]
    ClockBeforeEpoch,
}

impl TwoFactorError {
    /// Taxonomy bucket for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// A base32 TOTP shared secret.
///
/// `Debug` is redacted so the secret cannot end up in logs by accident.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TotpSecret(String);

impl TotpSecret {
    /// Wrap an already-encoded base32 secret (as stored in `users.totp`).
    #[must_use]
    pub fn from_base32(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The base32 text, suitable for manual entry in an authenticator.
    #[must_use]
    pub fn as_base32(&self) -> &str {
        &self.0
    }

    fn to_bytes(&self) -> Result<Vec<u8>, TwoFactorError> {
        let normalized: String = self
            .0
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '=')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        Secret::Encoded(normalized)
            .to_bytes()
            .map_err(|_| TwoFactorError::InvalidSecret)
    }
}

impl fmt::Debug for TotpSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TotpSecret([REDACTED])")
    }
}

/// Secret enrollment material shown to the user before they opt in.
#[derive(Debug, Clone)]
pub struct Enrollment {
    /// Candidate secret (also stashed in the request context).
    pub secret: TotpSecret,
    /// `otpauth://` URI for rendering as a QR code.
    pub provisioning_uri: String,
}

/// TOTP generator/verifier with a fixed issuer and drift tolerance.
#[derive(Debug, Clone)]
pub struct TwoFactor {
    issuer: String,
    skew: u8,
}

impl TwoFactor {
    /// Create a verifier.
    ///
    /// `skew` is the number of 30-second steps accepted on either side of
    /// the current one.
    #[must_use]
    pub fn new(issuer: impl Into<String>, skew: u8) -> Self {
        Self {
            issuer: issuer.into(),
            skew,
        }
    }

    /// Create a verifier from configuration.
    #[must_use]
    pub fn from_config(config: &TwoFactorConfig) -> Self {
        Self::new(config.issuer.clone(), config.skew)
    }

    /// Issuer label used in provisioning URIs.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Generate a fresh random secret.
    #[must_use]
    pub fn generate_secret() -> TotpSecret {
        let bytes: [u8; SECRET_BYTES] = rand::random();
        TotpSecret(Secret::Raw(bytes.to_vec()).to_encoded().to_string())
    }

    /// Provisioning URI for this verifier's issuer.
    #[must_use]
    pub fn provisioning_uri(&self, secret: &TotpSecret, account_label: &str) -> String {
        provisioning_uri(secret, account_label, &self.issuer)
    }

    /// Check `code` against `secret` at time `at`.
    ///
    /// Anything other than exactly six ASCII digits is rejected without
    /// computing a code.
    ///
    /// # Errors
    ///
    /// Returns [`TwoFactorError::InvalidSecret`] if the secret cannot be decoded
    /// and [`TwoFactorError::ClockBeforeEpoch`] for times before 1970.
    pub fn verify(
        &self,
        secret: &TotpSecret,
        code: &str,
        at: SystemTime,
    ) -> Result<bool, TwoFactorError> {
        if !is_well_formed_code(code) {
            return Ok(false);
        }
        let totp = self.totp(secret)?;
        Ok(totp.check(code, unix_seconds(at)?))
    }

    /// The code an authenticator would show for `secret` at time `at`.
    ///
    /// # Errors
    ///
    /// Same as [`TwoFactor::verify`].
    pub fn code_at(&self, secret: &TotpSecret, at: SystemTime) -> Result<String, TwoFactorError> {
        let totp = self.totp(secret)?;
        Ok(totp.generate(unix_seconds(at)?))
    }

    fn totp(&self, secret: &TotpSecret) -> Result<TOTP, TwoFactorError> {
        TOTP::new(
            Algorithm::SHA1,
            CODE_DIGITS,
            self.skew,
            STEP_SECONDS,
            secret.to_bytes()?,
        )
        .map_err(|_| TwoFactorError::InvalidSecret)
    }
}

/// Build an `otpauth://totp/` URI for authenticator enrollment.
///
/// Pure formatting; rendering it as a QR code is left to the caller.
#[must_use]
pub fn provisioning_uri(secret: &TotpSecret, account_label: &str, issuer: &str) -> String {
    let issuer = urlencoding::encode(issuer);
    format!(
        "otpauth://totp/{issuer}:{label}?secret={secret}&issuer={issuer}",
        label = urlencoding::encode(account_label),
        secret = secret.as_base32(),
    )
}

fn is_well_formed_code(code: &str) -> bool {
    code.len() == CODE_DIGITS && code.bytes().all(|b| b.is_ascii_digit())
}

fn unix_seconds(at: SystemTime) -> Result<u64, TwoFactorError> {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| TwoFactorError::ClockBeforeEpoch)
}
