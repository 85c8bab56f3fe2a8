//! Cover image uploads for books and lists.
//!
//! An upload is accepted when its filename carries an allowed extension and
//! its bytes parse as a structurally sound image. Accepted images are always stored as
//! `<slug>.png`, whatever their real format.

mod error;

pub use error::UploadError;

use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::LazyLock;

use image::{ImageFormat, ImageReader};
use regex::Regex;
use tracing::{debug, instrument};
use unicode_normalization::UnicodeNormalization;

use crate::config::UploadConfig;

/// Extensions accepted for uploads, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Extension of every stored asset.
const ASSET_EXTENSION: &str = "png";

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Characters dropped from asset names.
static UNSAFE_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("Invalid regex"));

/// An uploaded file: original client filename plus a seekable byte stream.
#[derive(Debug)]
pub struct UploadHandle<R> {
    pub filename: String,
    pub stream: R,
}

impl<R: Read + Seek> UploadHandle<R> {
    /// Wrap an upload.
    pub fn new(filename: impl Into<String>, stream: R) -> Self {
        Self {
            filename: filename.into(),
            stream,
        }
    }
}

/// Whether `filename` ends in an allowed image extension.
///
/// ```
/// use bookshelf_storefront::services::uploads::has_allowed_extension;
///
/// assert!(has_allowed_extension("cover.JPG"));
/// assert!(!has_allowed_extension("cover"));
/// ```
#[must_use]
pub fn has_allowed_extension(filename: &str) -> bool {
    filename.rsplit_once('.').is_some_and(|(_, ext)| {
        ALLOWED_EXTENSIONS
            .iter()
            .any(|allowed| ext.eq_ignore_ascii_case(allowed))
    })
}

/// Rewinds the wrapped stream to the start when dropped.
struct Rewind<'a, R: Seek>(&'a mut R);

impl<R: Seek> Drop for Rewind<'_, R> {
    fn drop(&mut self) {
        let _ = self.0.seek(SeekFrom::Start(0));
    }
}

/// Whether `stream` holds a PNG, JPEG or GIF image.
///
/// The format signature and header are parsed; pixel data is not decoded.
/// PNG files must also carry an intact chunk list: every chunk CRC is
/// checked up to `IEND`. The stream is rewound to the start on return,
/// whatever the outcome.
pub fn is_genuine_image<R: Read + Seek>(stream: &mut R) -> bool {
    let guard = Rewind(stream);
    if guard.0.seek(SeekFrom::Start(0)).is_err() {
        return false;
    }

    let Ok(reader) = ImageReader::new(BufReader::new(&mut *guard.0)).with_guessed_format() else {
        return false;
    };
    let Some(format) = reader.format() else {
        return false;
    };
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif)
        || reader.into_dimensions().is_err()
    {
        return false;
    }

    if format != ImageFormat::Png {
        return true;
    }
    guard.0.seek(SeekFrom::Start(0)).is_ok()
        && png_chunks_intact(&mut BufReader::new(&mut *guard.0))
}

/// Feeds everything written into a CRC-32.
struct CrcWriter(crc32fast::Hasher);

impl Write for CrcWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Walk a PNG from its signature to `IEND`, checking every chunk's CRC.
///
/// Chunk data is streamed through the checksum, never buffered whole.
fn png_chunks_intact<R: Read>(stream: &mut R) -> bool {
    let mut signature = [0u8; 8];
    if stream.read_exact(&mut signature).is_err() || signature != PNG_SIGNATURE {
        return false;
    }

    let mut first = true;
    loop {
        let mut header = [0u8; 8];
        if stream.read_exact(&mut header).is_err() {
            return false;
        }
        let [l0, l1, l2, l3, t0, t1, t2, t3] = header;
        let length = u64::from(u32::from_be_bytes([l0, l1, l2, l3]));
        let kind = [t0, t1, t2, t3];
        if first && kind != *b"IHDR" {
            return false;
        }
        first = false;

        let mut crc = CrcWriter(crc32fast::Hasher::new());
        crc.0.update(&kind);
        match io::copy(&mut stream.by_ref().take(length), &mut crc) {
            Ok(copied) if copied == length => {}
            _ => return false,
        }

        let mut stored = [0u8; 4];
        if stream.read_exact(&mut stored).is_err()
            || u32::from_be_bytes(stored) != crc.0.finalize()
        {
            return false;
        }
        if kind == *b"IEND" {
            return true;
        }
    }
}

/// Reduce an arbitrary label to a safe file stem.
///
/// Accented letters are folded to ASCII (`é` becomes `e`), path separators
/// become word breaks, whitespace runs become `_`, every character outside
/// `[A-Za-z0-9_.-]` is dropped, and leading or trailing
/// `.`/`_` are trimmed, so the result can never name a parent directory.
///
/// # Errors
///
/// Returns `UploadError::InvalidSlug` if nothing is left.
pub fn sanitize_slug(slug: &str) -> Result<String, UploadError> {
    let folded: String = slug.nfkd().filter(char::is_ascii).collect();
    let spaced = folded.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = UNSAFE_CHARS_RE.replace_all(&joined, "");
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        return Err(UploadError::InvalidSlug(slug.to_owned()));
    }
    Ok(trimmed.to_owned())
}

/// Stored file name for an asset labelled `slug`.
///
/// # Errors
///
/// Returns `UploadError::InvalidSlug` if the slug sanitizes to nothing.
pub fn asset_file_name(slug: &str) -> Result<String, UploadError> {
    Ok(format!("{}.{ASSET_EXTENSION}", sanitize_slug(slug)?))
}

/// Writes accepted images to the upload directory.
#[derive(Debug, Clone)]
pub struct AssetStore {
    dir: PathBuf,
    url_prefix: String,
}

impl AssetStore {
    /// Create a store writing under `dir`, served at `url_prefix`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_owned(),
        }
    }

    /// Create a store from configuration.
    #[must_use]
    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.dir.clone(), &config.url_prefix)
    }

    /// Validate and store an upload, returning its public URL.
    ///
    /// An existing asset with the same slug is overwritten. The upload
    /// stream is rewound to the start afterwards.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::DisallowedExtension` or `UploadError::NotAnImage`
    /// for rejected uploads, `UploadError::InvalidSlug` for an unusable slug,
    /// and `UploadError::Io` if the file cannot be written.
    #[instrument(skip_all, fields(filename = %upload.filename))]
    pub async fn store<R: Read + Seek>(
        &self,
        slug: &str,
        upload: &mut UploadHandle<R>,
    ) -> Result<String, UploadError> {
        if !has_allowed_extension(&upload.filename) {
            return Err(UploadError::DisallowedExtension(upload.filename.clone()));
        }
        if !is_genuine_image(&mut upload.stream) {
            return Err(UploadError::NotAnImage);
        }
        let file_name = asset_file_name(slug)?;

        let bytes = {
            let guard = Rewind(&mut upload.stream);
            let mut bytes = Vec::new();
            guard.0.read_to_end(&mut bytes)?;
            bytes
        };

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&file_name), &bytes).await?;

        debug!(file_name = %file_name, size = bytes.len(), "asset stored");
        Ok(format!("{}/{file_name}", self.url_prefix))
    }
}
