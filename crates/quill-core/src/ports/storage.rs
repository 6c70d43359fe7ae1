//! Image storage port - an external object store / CDN.

use async_trait::async_trait;

/// An image accepted by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Public HTTPS URL the image is served from.
    pub url: String,
    /// Provider-side identifier.
    pub public_id: String,
}

/// Image upload to an external store.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<StoredImage, StorageError>;
}

/// Image storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage provider unreachable: {0}")]
    Transport(String),

    #[error("Storage provider rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected storage response: {0}")]
    Decode(String),
}
