//! Upload error types.

use thiserror::Error;

use crate::error::ErrorKind;

/// Why an uploaded image was not stored.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The filename has no extension or one outside the allow-list.
    #[error("file type not allowed: {0}")]
    DisallowedExtension(String),

    /// The bytes do not parse as a supported image.
    #[error("uploaded file is not a valid image")]
    NotAnImage,

    /// Nothing usable was left of the slug after sanitizing.
    #[error("invalid asset name: {0:?}")]
    InvalidSlug(String),

    /// Reading the upload or writing the asset failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Taxonomy bucket for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DisallowedExtension(_) | Self::NotAnImage | Self::InvalidSlug(_) => {
                ErrorKind::Validation
            }
            Self::Io(_) => ErrorKind::TransientStore,
        }
    }
}
