//! Catalog seeding command.

use std::path::Path;

use tracing::info;

use bookshelf_storefront::seed::{AdminAccount, CatalogFixtures, seed_admin, seed_catalog};
use bookshelf_storefront::services::auth::AuthService;
use bookshelf_storefront::services::catalog::CatalogService;
use bookshelf_storefront::services::two_factor::TwoFactor;

use super::{CommandError, connect, read_password};

/// Starter catalog shipped with the CLI.
const BUNDLED_FIXTURES: &str = include_str!("../../fixtures/catalog.yaml");

/// Seed the catalog and optionally an admin account.
///
/// Fixtures are parsed and validated, and the admin password is read, before
/// any database connection is made.
pub async fn run(
    fixtures: Option<&Path>,
    admin_email: Option<String>,
    admin_name: String,
) -> Result<(), CommandError> {
    let fixtures = match fixtures {
        Some(path) => {
            info!(path = %path.display(), "Loading fixtures from file");
            CatalogFixtures::from_file(path).await?
        }
        None => CatalogFixtures::from_yaml(BUNDLED_FIXTURES)?,
    };

    let admin = match admin_email {
        Some(email) => Some(AdminAccount {
            name: admin_name,
            email,
            password: read_password().await?,
        }),
        None => None,
    };

    let (config, pool) = connect().await?;

    let result = seed_catalog(&pool, &fixtures).await?;
    info!(
        books = result.books_inserted,
        lists = result.lists_inserted,
        relations = result.relations_inserted,
        "Inserted fixture rows"
    );

    if let Some(admin) = admin {
        let two_factor = TwoFactor::from_config(&config.two_factor);
        let auth = AuthService::new(&pool, &two_factor);
        let created = seed_admin(&auth, &admin).await?;
        info!(email = %admin.email, created, "Admin account");
    }

    let stats = CatalogService::new(&pool).stats().await?;
    info!(
        books = stats.books,
        lists = stats.lists,
        relations = stats.relations,
        users = stats.users,
        "Seeding complete"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_fixtures_are_valid() {
        let fixtures = CatalogFixtures::from_yaml(BUNDLED_FIXTURES).unwrap();
        assert_eq!(fixtures.books.len(), 10);
        assert_eq!(fixtures.lists.len(), 6);
        assert_eq!(fixtures.relations.len(), 15);
        assert!(fixtures.books.iter().all(|b| b.stock.is_some()));
        assert!(fixtures.lists.iter().all(|l| l.image_url.is_some()));
    }
}
