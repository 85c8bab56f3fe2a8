//! Bookshelf Core - Shared types library.
//!
//! This crate provides the types shared by every Bookshelf component:
//! - `storefront` - Credential store, two-factor verification, catalog and uploads
//! - `cli` - Migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access. The
//! optional `postgres` feature adds `sqlx` encode/decode support so the types
//! can be bound and fetched directly.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for entity IDs and email addresses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
