//! Book repository.

use sqlx::PgConnection;

use bookshelf_core::{BookId, ListId};

use super::{RepositoryError, like_pattern};
use crate::models::{Book, NewBook};

const BOOK_COLUMNS: &str =
    "id, title, author, genre, isbn, publication_date, description, image_url, stock";

/// Repository for `books` and the book side of `book_list_relations`.
pub struct BookRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> BookRepository<'c> {
    /// Create a repository on a connection (usually an open transaction).
    #[must_use]
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Insert a book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the ISBN already exists.
    pub async fn insert(&mut self, book: &NewBook) -> Result<BookId, RepositoryError> {
        let (id,): (BookId,) = sqlx::query_as(
            r"
            INSERT INTO books
                (title, author, genre, isbn, publication_date, description, image_url, stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            ",
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(&book.isbn)
        .bind(&book.publication_date)
        .bind(&book.description)
        .bind(&book.image_url)
        .bind(book.stock)
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| RepositoryError::from_write(e, "isbn already exists"))?;

        Ok(id)
    }

    /// Get a book by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&mut self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(book)
    }

    /// Books whose title contains `term`, ignoring case.
    ///
    /// `term` is matched literally; `%` and `_` have no special meaning.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search_title(&mut self, term: &str) -> Result<Vec<Book>, RepositoryError> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE title ILIKE $1 ESCAPE '\\' ORDER BY id"
        ))
        .bind(like_pattern(term))
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(books)
    }

    /// Books linked to a list, in ID order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn in_list(&mut self, list: ListId) -> Result<Vec<Book>, RepositoryError> {
        let books = sqlx::query_as::<_, Book>(
            r"
            SELECT b.id, b.title, b.author, b.genre, b.isbn, b.publication_date,
                   b.description, b.image_url, b.stock
            FROM books b
            JOIN book_list_relations r ON r.book_id = b.id
            WHERE r.list_id = $1
            ORDER BY b.id
            ",
        )
        .bind(list)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(books)
    }

    /// Remove every relation row for a book. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_relations(&mut self, id: BookId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM book_list_relations WHERE book_id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete the book row. Returns `false` if it did not exist.
    ///
    /// Relation rows must already be gone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&mut self, id: BookId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of books.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&mut self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM books")
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }
}
