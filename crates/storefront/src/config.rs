//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BOOKSHELF_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//!
//! ## Optional
//! - `BOOKSHELF_UPLOAD_DIR` - Where cover images are written (default: `static`)
//! - `BOOKSHELF_ASSET_URL_PREFIX` - Public URL prefix for stored images (default: `/static`)
//! - `BOOKSHELF_TOTP_ISSUER` - Issuer shown in authenticator apps (default: `Bookshelf`)
//! - `BOOKSHELF_TOTP_SKEW` - Accepted clock drift in 30 s steps (default: 0, current step only)

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

use crate::error::ErrorKind;

const DEFAULT_UPLOAD_DIR: &str = "static";
const DEFAULT_ASSET_URL_PREFIX: &str = "/static";
const DEFAULT_TOTP_ISSUER: &str = "Bookshelf";
const DEFAULT_TOTP_SKEW: &str = "0";
const MAX_TOTP_SKEW: u8 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

impl ConfigError {
    /// Taxonomy bucket for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Cover image storage
    pub uploads: UploadConfig,
    /// Second-factor settings
    pub two_factor: TwoFactorConfig,
}

/// Where uploaded catalog images go and how they are addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Directory images are written to.
    pub dir: PathBuf,
    /// URL prefix the directory is served under, without trailing slash.
    pub url_prefix: String,
}

/// TOTP settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoFactorConfig {
    /// Issuer label embedded in provisioning URIs.
    pub issuer: String,
    /// Steps of drift accepted on either side of the current one.
    pub skew: u8,
}

impl Default for TwoFactorConfig {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_TOTP_ISSUER.to_owned(),
            skew: 0,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let database_url = env
            .get("BOOKSHELF_DATABASE_URL")
            .or_else(|| env.get("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("BOOKSHELF_DATABASE_URL".to_string()))?;

        let uploads = UploadConfig {
            dir: PathBuf::from(env.get_or("BOOKSHELF_UPLOAD_DIR", DEFAULT_UPLOAD_DIR)),
            url_prefix: env
                .get_or("BOOKSHELF_ASSET_URL_PREFIX", DEFAULT_ASSET_URL_PREFIX)
                .trim_end_matches('/')
                .to_owned(),
        };

        let issuer = env.get_or("BOOKSHELF_TOTP_ISSUER", DEFAULT_TOTP_ISSUER);
        if issuer.trim().is_empty() || issuer.contains(':') {
            return Err(ConfigError::InvalidEnvVar(
                "BOOKSHELF_TOTP_ISSUER".to_string(),
                "must be non-empty and must not contain ':'".to_string(),
            ));
        }
        let skew = env
            .get_or("BOOKSHELF_TOTP_SKEW", DEFAULT_TOTP_SKEW)
            .parse::<u8>()
            .map_err(|e| ConfigError::InvalidEnvVar("BOOKSHELF_TOTP_SKEW".to_string(), e.to_string()))?;
        if skew > MAX_TOTP_SKEW {
            return Err(ConfigError::InvalidEnvVar(
                "BOOKSHELF_TOTP_SKEW".to_string(),
                format!("must be at most {MAX_TOTP_SKEW}"),
            ));
        }

        Ok(Self {
            database_url,
            uploads,
            two_factor: TwoFactorConfig { issuer, skew },
        })
    }
}

/// Variable source with empty values treated as unset.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.is_empty())
    }

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }
}
