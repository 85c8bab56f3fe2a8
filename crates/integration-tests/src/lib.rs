//! Integration tests for Bookshelf.
//!
//! # Running Tests
//!
//! ```bash
//! # Upload tests need no database
//! cargo test -p bookshelf-integration-tests
//!
//! # Database tests create a scratch database per test from DATABASE_URL
//! DATABASE_URL=postgres://localhost/bookshelf \
//!     cargo test -p bookshelf-integration-tests -- --include-ignored
//! ```
//!
//! This library holds the fixtures shared by the files under `tests/`.

use std::io::Cursor;

use image::{ImageFormat, RgbImage, RgbaImage};

use bookshelf_storefront::models::{NewBook, NewBookList};
use bookshelf_storefront::config::TwoFactorConfig;
use bookshelf_storefront::services::two_factor::TwoFactor;

/// A password that satisfies every composition rule.
pub const PASSWORD: &str = "1Secret1234**";

/// A second valid password, for change-password tests.
pub const NEW_PASSWORD: &str = "AAAbbccd@\"9klk";

/// Verifier used by the flow tests, with the default configuration.
#[must_use]
pub fn two_factor() -> TwoFactor {
    TwoFactor::from_config(&TwoFactorConfig::default())
}

/// A book with the given title and ISBN and placeholder other fields.
#[must_use]
pub fn new_book(title: &str, isbn: &str) -> NewBook {
    NewBook {
        title: title.to_owned(),
        author: "Test Author".to_owned(),
        genre: "Roman".to_owned(),
        isbn: isbn.to_owned(),
        publication_date: "1943-04-06".to_owned(),
        description: "A test book.".to_owned(),
        image_url: None,
        stock: Some(3),
    }
}

/// A list with the given name.
#[must_use]
pub fn new_list(name: &str) -> NewBookList {
    NewBookList {
        list_name: name.to_owned(),
        description: format!("{name} shelf"),
        image_url: None,
    }
}

/// Encode a small solid image in `format`.
///
/// # Panics
///
/// Panics if the encoder for `format` is not compiled in.
#[must_use]
pub fn image_bytes(format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    let written = if format == ImageFormat::Gif {
        RgbaImage::new(8, 8).write_to(&mut out, format)
    } else {
        RgbImage::new(8, 8).write_to(&mut out, format)
    };
    written.expect("Failed to encode test image");
    out.into_inner()
}
