//! Catalog statistics command.

use bookshelf_storefront::services::catalog::CatalogService;

use super::{CommandError, connect};

/// Print row counts for books, lists, relations and users.
pub async fn run(json: bool) -> Result<(), CommandError> {
    let (_, pool) = connect().await?;
    let stats = CatalogService::new(&pool).stats().await?;

    let output = if json {
        serde_json::to_string_pretty(&stats)?
    } else {
        format!(
            "books:     {}\nlists:     {}\nrelations: {}\nusers:     {}",
            stats.books, stats.lists, stats.relations, stats.users
        )
    };

    #[allow(clippy::print_stdout)]
    {
        println!("{output}");
    }
    Ok(())
}
