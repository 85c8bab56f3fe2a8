//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, password login, password changes and the TOTP
//!   login step
//! - `two_factor` - TOTP secrets, provisioning URIs and code checks
//! - `catalog` - Books, curated lists and list membership
//! - `uploads` - Cover image validation and storage

pub mod auth;
pub mod catalog;
pub mod two_factor;
pub mod uploads;
