//! Object storage gateway used for listing media.

pub mod memory;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use uuid::Uuid;

pub use memory::MemoryStorage;

#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Upload an inline `data:` URL to `path`.
    async fn put_data_url(&self, path: &str, data_url: &str) -> Result<StoredObject, StorageError>;

    async fn put_bytes(&self, path: &str, bytes: Vec<u8>) -> Result<StoredObject, StorageError>;

    /// Resolve a stored object to a durable download URL.
    async fn download_url(&self, path: &str) -> Result<String, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// Metadata reported once an upload completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Normalized path without a leading slash, e.g. `listing_images/l-1/3f2c…`.
    pub full_path: String,
    pub content_type: Option<String>,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("object {0} not found")]
    NotFound(String),
    #[error("invalid data url: {0}")]
    InvalidDataUrl(String),
    #[error("upload to {path} rejected: {reason}")]
    Rejected { path: String, reason: String },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Fresh, collision-free object path for a listing's media.
pub fn media_object_path(root: &str, listing_id: &str) -> String {
    format!(
        "{}/{}/{}",
        root.trim_matches('/'),
        listing_id,
        Uuid::new_v4()
    )
}

/// Strip leading/trailing slashes and collapse empty segments.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decoded `data:[<mediatype>][;base64],<payload>` URL.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    pub mime: mime::Mime,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let rest = raw
            .strip_prefix("data:")
            .ok_or_else(|| StorageError::InvalidDataUrl("missing `data:` scheme".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| StorageError::InvalidDataUrl("missing `,` separator".to_string()))?;

        let (media_type, is_base64) = match header.strip_suffix(";base64") {
            Some(media_type) => (media_type, true),
            None => (header, false),
        };

        let mime = if media_type.is_empty() {
            mime::TEXT_PLAIN
        } else {
            media_type
                .parse::<mime::Mime>()
                .map_err(|err| StorageError::InvalidDataUrl(format!("{media_type}: {err}")))?
        };

        let bytes = if is_base64 {
            STANDARD
                .decode(payload.trim())
                .map_err(|err| StorageError::InvalidDataUrl(err.to_string()))?
        } else {
            urlencoding::decode_binary(payload.as_bytes()).into_owned()
        };

        Ok(Self { mime, bytes })
    }
}
