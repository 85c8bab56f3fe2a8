//! Curated book lists (shelves).

use serde::{Deserialize, Serialize};

use bookshelf_core::ListId;

/// A curated shelf grouping books by theme or genre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookList {
    pub id: ListId,
    pub list_name: String,
    pub description: String,
    pub image_url: Option<String>,
}

/// Fields for a list that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBookList {
    pub list_name: String,
    pub description: String,
    pub image_url: Option<String>,
}
