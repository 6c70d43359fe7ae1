//! Image upload handler.

use actix_multipart::{Field, Multipart};
use actix_web::{HttpResponse, web};
use futures::TryStreamExt;

use quill_shared::dto::UploadResponse;

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Largest accepted image, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const FILE_FIELD: &str = "file";

/// Buffer a field in memory, refusing anything over the size limit.
async fn read_capped(field: &mut Field) -> AppResult<Vec<u8>> {
    let mut bytes = Vec::new();

    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| AppError::bad_request(e.to_string()))?
    {
        if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::PayloadTooLarge(
                "File too large. Maximum size is 5MB".to_string(),
            ));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

/// POST /api/uploads - Protected route, multipart field `file`
pub async fn upload(
    state: web::Data<AppState>,
    identity: Identity,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::bad_request(e.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field
            .content_type()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_default();
        if !content_type.starts_with("image/") {
            return Err(AppError::bad_request("Only image files are allowed"));
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .filter(|name| !name.is_empty())
            .unwrap_or("upload")
            .to_string();

        let bytes = read_capped(&mut field).await?;
        tracing::info!(
            user_id = %identity.user_id,
            filename = %filename,
            content_type = %content_type,
            size = bytes.len(),
            "Uploading image"
        );

        let stored = state.images.upload(bytes, &filename, &content_type).await?;

        return Ok(HttpResponse::Created().json(UploadResponse {
            url: stored.url,
            filename: stored.public_id.clone(),
            public_id: stored.public_id,
        }));
    }

    Err(AppError::bad_request("No file uploaded"))
}
