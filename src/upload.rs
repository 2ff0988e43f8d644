// src/upload.rs
// Local upload validation, mirrored from the server's image checks

use std::path::Path;
use thiserror::Error;

pub const DEFAULT_MAX_UPLOAD_MB: u64 = 10;
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
pub const ALLOWED_MEDIA_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

const JPEG_MAGIC: &[u8] = b"\xff\xd8\xff";
const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const RIFF_MAGIC: &[u8] = b"RIFF";
const WEBP_TAG: &[u8] = b"WEBP";

/// A file picked by the user, held in memory until submission
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, declaring its media type from the extension
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let media_type = media_type_for_name(&name)
            .unwrap_or("application/octet-stream")
            .to_string();

        tracing::debug!("Read {} ({} bytes, {})", name, bytes.len(), media_type);

        Ok(Self {
            name,
            media_type,
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_bytes: u64,
}

impl UploadLimits {
    pub fn from_megabytes(mb: u64) -> Self {
        Self {
            max_bytes: mb.saturating_mul(1024 * 1024),
        }
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self::from_megabytes(DEFAULT_MAX_UPLOAD_MB)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Filename is required")]
    MissingFileName,

    #[error("File type not allowed. Allowed types: jpg, jpeg, png, webp")]
    UnsupportedExtension(String),

    #[error("Invalid content type: {0}")]
    UnsupportedMediaType(String),

    #[error("File is empty")]
    Empty,

    #[error("File too large ({size} bytes). Maximum size: {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("Invalid file content. File does not appear to be a valid image.")]
    SignatureMismatch,
}

pub fn media_type_for_name(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_string_lossy().to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn has_image_signature(bytes: &[u8]) -> bool {
    if bytes.starts_with(JPEG_MAGIC) || bytes.starts_with(PNG_MAGIC) {
        return true;
    }
    bytes.len() >= 12 && bytes.starts_with(RIFF_MAGIC) && &bytes[8..12] == WEBP_TAG
}

/// Reject files the server would refuse, without touching the network
pub fn validate_upload(file: &SelectedFile, limits: &UploadLimits) -> Result<(), ValidationError> {
    if file.name.trim().is_empty() {
        return Err(ValidationError::MissingFileName);
    }

    match file.extension() {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
        other => return Err(ValidationError::UnsupportedExtension(other.unwrap_or_default())),
    }

    let media_type = file.media_type.trim().to_lowercase();
    if !ALLOWED_MEDIA_TYPES.contains(&media_type.as_str()) {
        return Err(ValidationError::UnsupportedMediaType(file.media_type.clone()));
    }

    let size = file.size();
    if size == 0 {
        return Err(ValidationError::Empty);
    }
    if size > limits.max_bytes {
        return Err(ValidationError::TooLarge {
            size,
            max: limits.max_bytes,
        });
    }

    if !has_image_signature(&file.bytes) {
        return Err(ValidationError::SignatureMismatch);
    }

    Ok(())
}
