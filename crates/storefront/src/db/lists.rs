//! Book list repository.

use sqlx::PgConnection;

use bookshelf_core::{BookId, ListId};

use super::RepositoryError;
use crate::models::{BookList, NewBookList};

/// Repository for `book_lists` and relation inserts.
pub struct ListRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> ListRepository<'c> {
    /// Create a repository on a connection (usually an open transaction).
    #[must_use]
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Insert a list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&mut self, list: &NewBookList) -> Result<ListId, RepositoryError> {
        let (id,): (ListId,) = sqlx::query_as(
            r"
            INSERT INTO book_lists (list_name, description, image_url)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(&list.list_name)
        .bind(&list.description)
        .bind(&list.image_url)
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| RepositoryError::from_write(e, "list already exists"))?;

        Ok(id)
    }

    /// Every list, in ID order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all(&mut self) -> Result<Vec<BookList>, RepositoryError> {
        let lists = sqlx::query_as::<_, BookList>(
            "SELECT id, list_name, description, image_url FROM book_lists ORDER BY id",
        )
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(lists)
    }

    /// Lists a book belongs to, in ID order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn containing_book(&mut self, book: BookId) -> Result<Vec<BookList>, RepositoryError> {
        let lists = sqlx::query_as::<_, BookList>(
            r"
            SELECT l.id, l.list_name, l.description, l.image_url
            FROM book_lists l
            JOIN book_list_relations r ON r.list_id = l.id
            WHERE r.book_id = $1
            ORDER BY l.id
            ",
        )
        .bind(book)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(lists)
    }

    /// Add a book to a list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the book is already in the list.
    /// Returns `RepositoryError::NotFound` if the book or list does not exist.
    pub async fn link(&mut self, book: BookId, list: ListId) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO book_list_relations (book_id, list_id) VALUES ($1, $2)")
            .bind(book)
            .bind(list)
            .execute(&mut *self.conn)
            .await
            .map_err(|e| RepositoryError::from_write(e, "book already in list"))?;

        Ok(())
    }

    /// Number of lists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&mut self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM book_lists")
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }

    /// Number of relation rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn relation_count(&mut self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM book_list_relations")
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }
}
