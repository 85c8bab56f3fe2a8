//! Site user management commands.

use secrecy::ExposeSecret;

use bookshelf_storefront::services::auth::AuthService;
use bookshelf_storefront::services::two_factor::TwoFactor;

use super::{CommandError, connect, read_password};

/// Register a user with a password read from stdin.
///
/// The password must satisfy the same rules as web registration.
pub async fn create(email: &str, name: &str) -> Result<(), CommandError> {
    let password = read_password().await?;
    let (config, pool) = connect().await?;

    let two_factor = TwoFactor::from_config(&config.two_factor);
    let auth = AuthService::new(&pool, &two_factor);

    tracing::info!("Creating user: {email}");
    let id = auth.register(name, email, password.expose_secret()).await?;

    tracing::info!("User created successfully! ID: {id}, Email: {email}");
    Ok(())
}
