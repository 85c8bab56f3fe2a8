//! Catalog error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::error::ErrorKind;

/// Errors from catalog operations.
///
/// Empty result sets are errors here (`NoListsFound`, `EmptyList`,
/// `NoListsForBook`, `NoResults`); callers render them as "nothing to show"
/// pages.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("book not found")]
    BookNotFound,

    #[error("no book lists found")]
    NoListsFound,

    #[error("book list is empty")]
    EmptyList,

    #[error("book is not in any list")]
    NoListsForBook,

    #[error("no books match the search")]
    NoResults,

    #[error("a book with this ISBN already exists")]
    DuplicateIsbn,

    #[error("book is already in this list")]
    AlreadyLinked,

    /// A relation referenced a book or list that does not exist.
    #[error("unknown book or list: {0}")]
    UnknownReference(String),

    #[error("stock cannot be negative")]
    NegativeStock,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CatalogError {
    /// Taxonomy bucket for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::BookNotFound
            | Self::NoListsFound
            | Self::EmptyList
            | Self::NoListsForBook
            | Self::NoResults
            | Self::UnknownReference(_) => ErrorKind::NotFound,
            Self::DuplicateIsbn | Self::AlreadyLinked => ErrorKind::Conflict,
            Self::NegativeStock => ErrorKind::Validation,
            Self::Repository(e) => e.kind(),
        }
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}
