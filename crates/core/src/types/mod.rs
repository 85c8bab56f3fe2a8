//! Core types for Bookshelf.

pub mod email;
pub mod id;

pub use email::{Email, EmailError};
pub use id::*;
