//! Book records.

use serde::{Deserialize, Serialize};

use bookshelf_core::BookId;

/// A catalog book.
///
/// `publication_date` is free text and is not checked against the calendar.
/// `stock` is only tracked by deployments that manage inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub isbn: String,
    pub publication_date: String,
    pub description: String,
    pub image_url: Option<String>,
    pub stock: Option<i32>,
}

/// Fields for a book that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub isbn: String,
    pub publication_date: String,
    pub description: String,
    pub image_url: Option<String>,
    pub stock: Option<i32>,
}
