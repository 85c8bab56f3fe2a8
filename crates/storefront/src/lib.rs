//! Bookshelf storefront library.
//!
//! Accounts with optional TOTP second factor, the book catalog, and cover
//! image uploads. The HTTP layer lives elsewhere; it owns the
//! [`models::RequestContext`] for each request and calls into the services
//! here.
//!
//! # Modules
//!
//! - [`services::auth`] - registration, password login, password changes
//! - [`services::two_factor`] - TOTP secrets and code checks
//! - [`services::catalog`] - books, lists and list membership
//! - [`services::uploads`] - cover image validation and storage
//! - [`seed`] - catalog fixtures

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod seed;
pub mod services;

pub use error::{Error, ErrorKind, Result};
