//! Subcommand implementations.

pub mod migrate;
pub mod seed;
pub mod stats;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;
use tokio::io::AsyncReadExt;

use bookshelf_storefront::config::{ConfigError, StorefrontConfig};
use bookshelf_storefront::db;
use bookshelf_storefront::seed::SeedError;
use bookshelf_storefront::services::auth::{AuthError, passwords_match};
use bookshelf_storefront::services::catalog::CatalogError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Seeding failed: {0}")]
    Seed(#[from] SeedError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No password on stdin")]
    MissingPassword,

    #[error("Password confirmation does not match")]
    PasswordMismatch,
}

/// Load configuration and open a connection pool.
pub async fn connect() -> Result<(StorefrontConfig, PgPool), CommandError> {
    let config = StorefrontConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;

    Ok((config, pool))
}

/// Read a password (and optional confirmation line) from stdin.
pub async fn read_password() -> Result<SecretString, CommandError> {
    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;
    parse_password_input(&input)
}

fn parse_password_input(input: &str) -> Result<SecretString, CommandError> {
    let mut lines = input.lines();
    let password = lines
        .next()
        .filter(|line| !line.is_empty())
        .ok_or(CommandError::MissingPassword)?;

    if lines
        .next()
        .is_some_and(|confirmation| !passwords_match(password, confirmation))
    {
        return Err(CommandError::PasswordMismatch);
    }

    Ok(SecretString::from(password.to_owned()))
}
