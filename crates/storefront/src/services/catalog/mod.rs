//! Catalog service: books, curated lists, and their membership.
//!
//! Every operation runs in one transaction. Deleting a book removes its
//! relation rows first and then the book, since the schema has no cascades.

mod error;

pub use error::CatalogError;

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument, warn};

use bookshelf_core::{BookId, ListId};

use crate::db::{BookRepository, ListRepository, RepositoryError, UserRepository};
use crate::models::{Book, BookList, NewBook, NewBookList};

/// Result of [`CatalogService::delete_book`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The book and its relation rows are gone.
    Deleted,
    /// No book had this ID; nothing changed.
    NotFound,
    /// A database error occurred and the transaction was rolled back.
    RolledBack,
}

impl DeleteOutcome {
    /// Whether the book was removed.
    #[must_use]
    pub const fn is_deleted(self) -> bool {
        matches!(self, Self::Deleted)
    }
}

/// Row counts across the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub books: i64,
    pub lists: i64,
    pub relations: i64,
    pub users: i64,
}

/// Catalog service.
pub struct CatalogService<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add a book.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateIsbn` if the ISBN is taken.
    /// Returns `CatalogError::NegativeStock` if `stock` is below zero.
    #[instrument(skip_all, fields(isbn = %book.isbn))]
    pub async fn create_book(&self, book: &NewBook) -> Result<BookId, CatalogError> {
        check_stock(book)?;

        let mut tx = self.pool.begin().await?;
        let id = insert_book(&mut *tx, book).await?;
        tx.commit().await?;

        debug!(book_id = %id, "book created");
        Ok(id)
    }

    /// Add a list.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the insert fails.
    #[instrument(skip_all)]
    pub async fn create_list(&self, list: &NewBookList) -> Result<ListId, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let id = ListRepository::new(&mut *tx).insert(list).await?;
        tx.commit().await?;

        debug!(list_id = %id, "list created");
        Ok(id)
    }

    /// Put a book on a list.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::AlreadyLinked` if the pair already exists.
    /// Returns `CatalogError::UnknownReference` if the book or list is missing.
    #[instrument(skip_all, fields(book_id = %book, list_id = %list))]
    pub async fn link_book_to_list(&self, book: BookId, list: ListId) -> Result<(), CatalogError> {
        let mut tx = self.pool.begin().await?;
        link(&mut *tx, book, list).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Add a book and put it on a list in one step.
    ///
    /// Nothing is stored if the list does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogService::create_book`] and
    /// [`CatalogService::link_book_to_list`].
    #[instrument(skip_all, fields(isbn = %book.isbn, list_id = %list))]
    pub async fn create_book_in_list(
        &self,
        book: &NewBook,
        list: ListId,
    ) -> Result<BookId, CatalogError> {
        check_stock(book)?;

        let mut tx = self.pool.begin().await?;
        let id = insert_book(&mut *tx, book).await?;
        link(&mut *tx, id, list).await?;
        tx.commit().await?;

        debug!(book_id = %id, "book created in list");
        Ok(id)
    }

    /// Get a book by ID.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::BookNotFound` if there is no such book.
    pub async fn get_book(&self, id: BookId) -> Result<Book, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let book = BookRepository::new(&mut *tx).get(id).await?;
        tx.commit().await?;

        book.ok_or(CatalogError::BookNotFound)
    }

    /// Every list.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NoListsFound` if there are none.
    pub async fn list_all_lists(&self) -> Result<Vec<BookList>, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let lists = ListRepository::new(&mut *tx).all().await?;
        tx.commit().await?;

        non_empty(lists, CatalogError::NoListsFound)
    }

    /// Books on a list.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyList` if the list has no books or does
    /// not exist.
    pub async fn books_in_list(&self, list: ListId) -> Result<Vec<Book>, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let books = BookRepository::new(&mut *tx).in_list(list).await?;
        tx.commit().await?;

        non_empty(books, CatalogError::EmptyList)
    }

    /// Lists a book is on.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NoListsForBook` if the book is on no list or
    /// does not exist.
    pub async fn lists_containing_book(&self, book: BookId) -> Result<Vec<BookList>, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let lists = ListRepository::new(&mut *tx).containing_book(book).await?;
        tx.commit().await?;

        non_empty(lists, CatalogError::NoListsForBook)
    }

    /// Case-insensitive title substring search.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NoResults` if nothing matches.
    #[instrument(skip_all)]
    pub async fn search_by_title(&self, term: &str) -> Result<Vec<Book>, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let books = BookRepository::new(&mut *tx).search_title(term).await?;
        tx.commit().await?;

        debug!(results = books.len(), "title search");
        non_empty(books, CatalogError::NoResults)
    }

    /// Delete a book and its relation rows.
    ///
    /// Never fails: a database error rolls the transaction back and is
    /// reported as [`DeleteOutcome::RolledBack`].
    #[instrument(skip_all, fields(book_id = %id))]
    pub async fn delete_book(&self, id: BookId) -> DeleteOutcome {
        match self.try_delete_book(id).await {
            Ok(true) => {
                debug!("book deleted");
                DeleteOutcome::Deleted
            }
            Ok(false) => {
                debug!("book to delete does not exist");
                DeleteOutcome::NotFound
            }
            Err(e) => {
                warn!(error = %e, "book delete rolled back");
                DeleteOutcome::RolledBack
            }
        }
    }

    async fn try_delete_book(&self, id: BookId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = async {
            let mut books = BookRepository::new(&mut *tx);
            let relations = books.delete_relations(id).await?;
            let deleted = books.delete(id).await?;
            debug!(relations, "relation rows removed");
            Ok::<_, RepositoryError>(deleted)
        }
        .await;

        match result {
            Ok(deleted) => {
                tx.commit().await?;
                Ok(deleted)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    /// Row counts for books, lists, relations and users.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if a count fails.
    pub async fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let stats = count_rows(&mut *tx).await?;
        tx.commit().await?;

        Ok(stats)
    }
}

/// Count catalog rows on an open connection.
pub(crate) async fn count_rows(conn: &mut PgConnection) -> Result<CatalogStats, RepositoryError> {
    let books = BookRepository::new(conn).count().await?;
    let mut lists = ListRepository::new(conn);
    let list_count = lists.count().await?;
    let relations = lists.relation_count().await?;
    let users = UserRepository::new(conn).count().await?;

    Ok(CatalogStats {
        books,
        lists: list_count,
        relations,
        users,
    })
}

async fn insert_book(conn: &mut PgConnection, book: &NewBook) -> Result<BookId, CatalogError> {
    BookRepository::new(conn)
        .insert(book)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CatalogError::DuplicateIsbn,
            other => CatalogError::Repository(other),
        })
}

async fn link(conn: &mut PgConnection, book: BookId, list: ListId) -> Result<(), CatalogError> {
    ListRepository::new(conn)
        .link(book, list)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CatalogError::AlreadyLinked,
            RepositoryError::NotFound(constraint) => CatalogError::UnknownReference(constraint),
            other => CatalogError::Repository(other),
        })
}

const fn check_stock(book: &NewBook) -> Result<(), CatalogError> {
    match book.stock {
        Some(stock) if stock < 0 => Err(CatalogError::NegativeStock),
        _ => Ok(()),
    }
}

fn non_empty<T>(items: Vec<T>, empty: CatalogError) -> Result<Vec<T>, CatalogError> {
    if items.is_empty() {
        Err(empty)
    } else {
        Ok(items)
    }
}
