//! Cloudinary signed uploads.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};

use quill_core::ports::{ImageStore, StorageError, StoredImage};

/// Cloudinary account settings.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Destination folder for every upload.
    pub folder: String,
    pub base_url: String,
}

impl CloudinaryConfig {
    pub const DEFAULT_FOLDER: &'static str = "blog-images";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.cloudinary.com";

    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            folder: Self::DEFAULT_FOLDER.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/image/upload",
            self.base_url.trim_end_matches('/'),
            self.cloud_name
        )
    }
}

#[derive(Debug, Deserialize)]
struct UploadResult {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Image store backed by Cloudinary's upload API.
pub struct CloudinaryImageStore {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryImageStore {
    pub fn new(config: CloudinaryConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, config }
    }
}

/// Cloudinary request signature: the parameters sorted by name, joined as
/// `k=v&k=v`, with the API secret appended, then SHA-1 hex encoded.
fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn rejection(status: u16, body: &str) -> StorageError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());

    StorageError::Rejected { status, message }
}

#[async_trait]
impl ImageStore for CloudinaryImageStore {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<StoredImage, StorageError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(
            &[
                ("folder", self.config.folder.as_str()),
                ("timestamp", timestamp.as_str()),
            ],
            &self.config.api_secret,
        );

        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let form = Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", self.config.folder.clone())
            .text("signature", signature);

        let response = self
            .client
            .post(self.config.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Cloudinary rejected upload");
            return Err(rejection(status.as_u16(), &body));
        }

        let result: UploadResult =
            serde_json::from_str(&body).map_err(|e| StorageError::Decode(e.to_string()))?;

        tracing::info!(public_id = %result.public_id, "Image uploaded");

        Ok(StoredImage {
            url: result.secure_url,
            public_id: result.public_id,
        })
    }
}
