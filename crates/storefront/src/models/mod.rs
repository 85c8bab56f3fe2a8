//! Domain models for the storefront.
//!
//! Catalog records are plain data with a fixed field order; they derive
//! `sqlx::FromRow` and are read by column name, never by position.

pub mod book;
pub mod book_list;
pub mod session;
pub mod user;

pub use book::{Book, NewBook};
pub use book_list::{BookList, NewBookList};
pub use session::{AuthState, CurrentUser, RequestContext};
pub use user::User;
