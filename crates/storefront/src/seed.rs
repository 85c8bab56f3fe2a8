//! Seed the catalog from YAML fixtures.
//!
//! Fixtures carry explicit IDs so relations can refer to them. Rows that
//! already exist (same ID, or same ISBN for books) are skipped, so seeding
//! twice is harmless.
//!
//! ## YAML Format
//!
//! ```yaml
//! books:
//!   - id: 1
//!     title: Le Petit Prince
//!     author: Antoine de Saint-Exupéry
//!     genre: Conte philosophique
//!     publication_date: "1943-04-06"
//!     isbn: "9782070612758"
//!     description: Un conte pour enfants.
//!     image_url: /static/Livre.jpeg
//! lists:
//!   - id: 1
//!     list_name: Classiques Français
//!     description: Une collection de classiques.
//! relations:
//!   - [1, 1]
//! ```

use std::collections::HashSet;
use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use tracing::{info, instrument};

use bookshelf_core::{BookId, ListId};

use crate::db::RepositoryError;
use crate::services::auth::{AuthError, AuthService};
use crate::services::catalog::{CatalogStats, count_rows};

/// Errors from seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read fixtures: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse fixtures: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid fixtures: {0}")]
    Invalid(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("admin account: {0}")]
    Auth(#[from] AuthError),
}

impl From<sqlx::Error> for SeedError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// A book row with a fixed ID.
#[derive(Debug, Clone, Deserialize)]
pub struct BookFixture {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub publication_date: String,
    pub isbn: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock: Option<i32>,
}

/// A list row with a fixed ID.
#[derive(Debug, Clone, Deserialize)]
pub struct ListFixture {
    pub id: ListId,
    pub list_name: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Full fixture file.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFixtures {
    #[serde(default)]
    pub books: Vec<BookFixture>,
    #[serde(default)]
    pub lists: Vec<ListFixture>,
    /// `[book_id, list_id]` pairs.
    #[serde(default)]
    pub relations: Vec<(BookId, ListId)>,
}

impl CatalogFixtures {
    /// Parse fixtures from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Parse` for malformed YAML and `SeedError::Invalid`
    /// if the fixtures are inconsistent.
    pub fn from_yaml(yaml: &str) -> Result<Self, SeedError> {
        let fixtures: Self = serde_yaml::from_str(yaml)?;
        fixtures.validate()?;
        Ok(fixtures)
    }

    /// Read and parse a fixture file.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogFixtures::from_yaml`], plus `SeedError::Io`.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&content)
    }

    /// Check IDs and ISBNs are unique, stock is non-negative and every
    /// relation refers to a fixture book and list.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Invalid` describing the first problem found.
    pub fn validate(&self) -> Result<(), SeedError> {
        let mut book_ids = HashSet::new();
        let mut isbns = HashSet::new();
        for book in &self.books {
            if !book_ids.insert(book.id) {
                return Err(SeedError::Invalid(format!("duplicate book id {}", book.id)));
            }
            if !isbns.insert(book.isbn.as_str()) {
                return Err(SeedError::Invalid(format!("duplicate isbn {}", book.isbn)));
            }
            if book.stock.is_some_and(|s| s < 0) {
                return Err(SeedError::Invalid(format!("negative stock for book {}", book.id)));
            }
        }

        let mut list_ids = HashSet::new();
        for list in &self.lists {
            if !list_ids.insert(list.id) {
                return Err(SeedError::Invalid(format!("duplicate list id {}", list.id)));
            }
        }

        for (book, list) in &self.relations {
            if !book_ids.contains(book) {
                return Err(SeedError::Invalid(format!("relation to unknown book {book}")));
            }
            if !list_ids.contains(list) {
                return Err(SeedError::Invalid(format!("relation to unknown list {list}")));
            }
        }

        Ok(())
    }
}

/// Counts from a seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub books_inserted: u64,
    pub lists_inserted: u64,
    pub relations_inserted: u64,
    /// Table sizes after seeding.
    pub stats: CatalogStats,
}

/// Account created alongside the catalog.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub name: String,
    pub email: String,
    pub password: SecretString,
}

/// Insert fixtures in one transaction and resync the ID sequences.
///
/// # Errors
///
/// Returns `SeedError::Repository` if any statement fails; nothing is
/// stored in that case.
#[instrument(skip_all, fields(
    books = fixtures.books.len(),
    lists = fixtures.lists.len(),
    relations = fixtures.relations.len()
))]
pub async fn seed_catalog(pool: &PgPool, fixtures: &CatalogFixtures) -> Result<SeedResult, SeedError> {
    let mut tx = pool.begin().await?;

    let mut result = SeedResult::default();
    for book in &fixtures.books {
        result.books_inserted += insert_book(&mut *tx, book).await?;
    }
    for list in &fixtures.lists {
        result.lists_inserted += insert_list(&mut *tx, list).await?;
    }
    for &(book, list) in &fixtures.relations {
        result.relations_inserted += insert_relation(&mut *tx, book, list).await?;
    }

    resync_sequence(&mut *tx, "books").await?;
    resync_sequence(&mut *tx, "book_lists").await?;
    result.stats = count_rows(&mut *tx).await?;

    tx.commit().await?;

    info!(
        books = result.books_inserted,
        lists = result.lists_inserted,
        relations = result.relations_inserted,
        "catalog seeded"
    );
    Ok(result)
}

/// Register the admin account. Returns `false` if the email is taken.
///
/// # Errors
///
/// Returns `SeedError::Auth` if the email or password is rejected.
#[instrument(skip_all)]
pub async fn seed_admin(auth: &AuthService<'_>, admin: &AdminAccount) -> Result<bool, SeedError> {
    match auth
        .register(&admin.name, &admin.email, admin.password.expose_secret())
        .await
    {
        Ok(id) => {
            info!(user_id = %id, "admin account created");
            Ok(true)
        }
        Err(AuthError::DuplicateEmail) => {
            info!("admin account already exists");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

async fn insert_book(conn: &mut PgConnection, book: &BookFixture) -> Result<u64, SeedError> {
    let result = sqlx::query(
        r"
        INSERT INTO books
            (id, title, author, genre, publication_date, isbn, description, image_url, stock)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT DO NOTHING
        ",
    )
    .bind(book.id)
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.genre)
    .bind(&book.publication_date)
    .bind(&book.isbn)
    .bind(&book.description)
    .bind(&book.image_url)
    .bind(book.stock)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

async fn insert_list(conn: &mut PgConnection, list: &ListFixture) -> Result<u64, SeedError> {
    let result = sqlx::query(
        r"
        INSERT INTO book_lists (id, list_name, description, image_url)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT DO NOTHING
        ",
    )
    .bind(list.id)
    .bind(&list.list_name)
    .bind(&list.description)
    .bind(&list.image_url)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

async fn insert_relation(
    conn: &mut PgConnection,
    book: BookId,
    list: ListId,
) -> Result<u64, SeedError> {
    let result = sqlx::query(
        "INSERT INTO book_list_relations (book_id, list_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(book)
    .bind(list)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Point a `SERIAL` sequence past the largest ID in `table`.
async fn resync_sequence(conn: &mut PgConnection, table: &str) -> Result<(), SeedError> {
    sqlx::query(&format!(
        "SELECT setval(pg_get_serial_sequence('{table}', 'id'), COALESCE(MAX(id), 0) + 1, false) FROM {table}"
    ))
    .execute(conn)
    .await?;

    Ok(())
}
