//! Object storage for previews, covers, full-quality files, and contracts.

mod memory;
mod s3;

use std::time::Duration;

use async_trait::async_trait;

pub use memory::{MemoryObjectStorage, StoredObject};
pub use s3::S3ObjectStorage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to store object '{key}': {message}")]
    PutFailed { key: String, message: String },

    #[error("Failed to sign URL for '{key}': {message}")]
    PresignFailed { key: String, message: String },

    #[error("Object not found: {0}")]
    NotFound(String),
}

/// Byte storage addressed by key.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<(), StorageError>;

    /// Short-lived GET URL that makes browsers save the object as `filename`.
    async fn presigned_download_url(
        &self,
        key: &str,
        filename: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError>;

    /// Public URL for catalog media (previews and covers).
    fn public_url(&self, key: &str) -> String;
}

/// MIME type for an uploaded file, guessed from its extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "zip" => "application/zip",
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
