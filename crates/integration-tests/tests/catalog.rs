//! Catalog tests: books, lists, membership, search, deletion and seeding.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use secrecy::SecretString;
use sqlx::PgPool;

use bookshelf_core::{BookId, ListId};
use bookshelf_integration_tests::{PASSWORD, new_book, new_list, two_factor};
use bookshelf_storefront::seed::{AdminAccount, CatalogFixtures, seed_admin, seed_catalog};
use bookshelf_storefront::services::auth::AuthService;
use bookshelf_storefront::services::catalog::{CatalogError, CatalogService, DeleteOutcome};

const FIXTURES: &str = r#"
books:
  - id: 1
    title: Le Petit Prince
    author: Antoine de Saint-Exupéry
    genre: Conte philosophique
    publication_date: "1943-04-06"
    isbn: "9782070612758"
    description: Un conte pour enfants.
  - id: 2
    title: "1984"
    author: George Orwell
    genre: Dystopie
    publication_date: "1949-06-08"
    isbn: "9780451524935"
    description: Surveillance.
    stock: 4
lists:
  - id: 1
    list_name: Classiques
    description: Des classiques.
  - id: 2
    list_name: Dystopies
    description: Des futurs sombres.
relations:
  - [1, 1]
  - [2, 1]
  - [2, 2]
"#;

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn create_and_get_book(pool: PgPool) {
    let catalog = CatalogService::new(&pool);
    let input = new_book("Le Petit Prince", "9782070612758");

    let id = catalog.create_book(&input).await.unwrap();
    let book = catalog.get_book(id).await.unwrap();

    assert_eq!(book.id, id);
    assert_eq!(book.title, input.title);
    assert_eq!(book.isbn, input.isbn);
    assert_eq!(book.stock, Some(3));
    assert_eq!(book.image_url, None);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn empty_catalog_reports_each_kind_of_absence(pool: PgPool) {
    let catalog = CatalogService::new(&pool);

    assert!(matches!(
        catalog.get_book(BookId::new(1)).await,
        Err(CatalogError::BookNotFound)
    ));
    assert!(matches!(
        catalog.list_all_lists().await,
        Err(CatalogError::NoListsFound)
    ));
    assert!(matches!(
        catalog.books_in_list(ListId::new(1)).await,
        Err(CatalogError::EmptyList)
    ));
    assert!(matches!(
        catalog.lists_containing_book(BookId::new(1)).await,
        Err(CatalogError::NoListsForBook)
    ));
    assert!(matches!(
        catalog.search_by_title("Prince").await,
        Err(CatalogError::NoResults)
    ));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn duplicate_isbn_and_negative_stock_are_rejected(pool: PgPool) {
    let catalog = CatalogService::new(&pool);
    catalog
        .create_book(&new_book("Le Petit Prince", "9782070612758"))
        .await
        .unwrap();

    assert!(matches!(
        catalog
            .create_book(&new_book("Another Prince", "9782070612758"))
            .await,
        Err(CatalogError::DuplicateIsbn)
    ));

    let mut negative = new_book("Negative", "9780000000001");
    negative.stock = Some(-1);
    assert!(matches!(
        catalog.create_book(&negative).await,
        Err(CatalogError::NegativeStock)
    ));

    assert_eq!(catalog.stats().await.unwrap().books, 1);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn membership_in_both_directions(pool: PgPool) {
    let catalog = CatalogService::new(&pool);
    let classics = catalog.create_list(&new_list("Classiques")).await.unwrap();
    let french = catalog.create_list(&new_list("Français")).await.unwrap();
    let prince = catalog
        .create_book(&new_book("Le Petit Prince", "9782070612758"))
        .await
        .unwrap();
    let orwell = catalog
        .create_book(&new_book("1984", "9780451524935"))
        .await
        .unwrap();

    catalog.link_book_to_list(prince, classics).await.unwrap();
    catalog.link_book_to_list(prince, french).await.unwrap();
    catalog.link_book_to_list(orwell, classics).await.unwrap();

    let in_classics: Vec<_> = catalog
        .books_in_list(classics)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(in_classics, vec![prince, orwell]);

    let prince_lists: Vec<_> = catalog
        .lists_containing_book(prince)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.id)
        .collect();
    assert_eq!(prince_lists, vec![classics, french]);

    let all: Vec<_> = catalog
        .list_all_lists()
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.list_name)
        .collect();
    assert_eq!(all, vec!["Classiques", "Français"]);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn linking_twice_or_to_missing_rows_fails(pool: PgPool) {
    let catalog = CatalogService::new(&pool);
    let list = catalog.create_list(&new_list("Classiques")).await.unwrap();
    let book = catalog
        .create_book(&new_book("Le Petit Prince", "9782070612758"))
        .await
        .unwrap();

    catalog.link_book_to_list(book, list).await.unwrap();
    assert!(matches!(
        catalog.link_book_to_list(book, list).await,
        Err(CatalogError::AlreadyLinked)
    ));
    assert!(matches!(
        catalog.link_book_to_list(book, ListId::new(999)).await,
        Err(CatalogError::UnknownReference(_))
    ));
    assert!(matches!(
        catalog.link_book_to_list(BookId::new(999), list).await,
        Err(CatalogError::UnknownReference(_))
    ));

    assert_eq!(catalog.stats().await.unwrap().relations, 1);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn create_book_in_missing_list_stores_nothing(pool: PgPool) {
    let catalog = CatalogService::new(&pool);

    let err = catalog
        .create_book_in_list(&new_book("Le Petit Prince", "9782070612758"), ListId::new(7))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::UnknownReference(_)));
    assert_eq!(catalog.stats().await.unwrap().books, 0);

    let list = catalog.create_list(&new_list("Classiques")).await.unwrap();
    let id = catalog
        .create_book_in_list(&new_book("Le Petit Prince", "9782070612758"), list)
        .await
        .unwrap();
    assert_eq!(catalog.books_in_list(list).await.unwrap()[0].id, id);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn title_search_is_case_insensitive_substring(pool: PgPool) {
    let catalog = CatalogService::new(&pool);
    let prince = catalog
        .create_book(&new_book("Le Petit Prince", "9782070612758"))
        .await
        .unwrap();
    catalog
        .create_book(&new_book("1984", "9780451524935"))
        .await
        .unwrap();

    for term in ["Prince", "prince", "PETIT", "e P"] {
        let hits: Vec<_> = catalog
            .search_by_title(term)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(hits, vec![prince], "{term:?}");
    }

    assert_eq!(catalog.search_by_title("").await.unwrap().len(), 2);
    assert!(matches!(
        catalog.search_by_title("Orwell").await,
        Err(CatalogError::NoResults)
    ));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn title_search_treats_wildcards_literally(pool: PgPool) {
    let catalog = CatalogService::new(&pool);
    catalog
        .create_book(&new_book("Le Petit Prince", "9782070612758"))
        .await
        .unwrap();
    let percent = catalog
        .create_book(&new_book("100% Romance", "9780000000002"))
        .await
        .unwrap();

    assert!(matches!(
        catalog.search_by_title("_e").await,
        Err(CatalogError::NoResults)
    ));
    let hits = catalog.search_by_title("0%").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, percent);
    assert!(matches!(
        catalog.search_by_title("%").await.map(|b| b.len()),
        Ok(1)
    ));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn deleting_a_book_removes_its_memberships(pool: PgPool) {
    let catalog = CatalogService::new(&pool);
    let classics = catalog.create_list(&new_list("Classiques")).await.unwrap();
    let french = catalog.create_list(&new_list("Français")).await.unwrap();
    let prince = catalog
        .create_book(&new_book("Le Petit Prince", "9782070612758"))
        .await
        .unwrap();
    let orwell = catalog
        .create_book(&new_book("1984", "9780451524935"))
        .await
        .unwrap();
    catalog.link_book_to_list(prince, classics).await.unwrap();
    catalog.link_book_to_list(prince, french).await.unwrap();
    catalog.link_book_to_list(orwell, classics).await.unwrap();

    assert_eq!(catalog.delete_book(prince).await, DeleteOutcome::Deleted);

    assert!(matches!(
        catalog.get_book(prince).await,
        Err(CatalogError::BookNotFound)
    ));
    assert!(matches!(
        catalog.books_in_list(french).await,
        Err(CatalogError::EmptyList)
    ));
    let remaining: Vec<_> = catalog
        .books_in_list(classics)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(remaining, vec![orwell]);

    let stats = catalog.stats().await.unwrap();
    assert_eq!(stats.books, 1);
    assert_eq!(stats.lists, 2);
    assert_eq!(stats.relations, 1);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn deleting_a_missing_book_is_not_found(pool: PgPool) {
    let catalog = CatalogService::new(&pool);
    assert_eq!(
        catalog.delete_book(BookId::new(42)).await,
        DeleteOutcome::NotFound
    );
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn seeding_is_idempotent_and_resyncs_ids(pool: PgPool) {
    let fixtures = CatalogFixtures::from_yaml(FIXTURES).unwrap();

    let first = seed_catalog(&pool, &fixtures).await.unwrap();
    assert_eq!(
        (first.books_inserted, first.lists_inserted, first.relations_inserted),
        (2, 2, 3)
    );

    let second = seed_catalog(&pool, &fixtures).await.unwrap();
    assert_eq!(
        (second.books_inserted, second.lists_inserted, second.relations_inserted),
        (0, 0, 0)
    );
    assert_eq!(second.stats, first.stats);
    assert_eq!(second.stats.relations, 3);

    // New rows continue after the fixture IDs.
    let catalog = CatalogService::new(&pool);
    let id = catalog
        .create_book(&new_book("Nouveau", "9780000000003"))
        .await
        .unwrap();
    assert_eq!(id, BookId::new(3));
    let list = catalog.create_list(&new_list("Nouveautés")).await.unwrap();
    assert_eq!(list, ListId::new(3));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn seeding_admin_twice_keeps_one_account(pool: PgPool) {
    let tf = two_factor();
    let auth = AuthService::new(&pool, &tf);
    let admin = AdminAccount {
        name: "admin".to_owned(),
        email: "admin@example.com".to_owned(),
        password: SecretString::from(PASSWORD.to_owned()),
    };

    assert!(seed_admin(&auth, &admin).await.unwrap());
    assert!(!seed_admin(&auth, &admin).await.unwrap());

    auth.authenticate("admin@example.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(CatalogService::new(&pool).stats().await.unwrap().users, 1);
}
