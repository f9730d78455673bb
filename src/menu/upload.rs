//! Image upload for menu items.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use serde_json::{json, Value};

use crate::http::{ApiError, AppState};

const FILE_FIELD: &str = "file";

/// Accept a multipart form with a `file` field and return its public URL.
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let max_bytes = state.config.storage.max_upload_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        if bytes.is_empty() {
            break;
        }
        if bytes.len() > max_bytes {
            return Err(ApiError::bad_request("File is too large."));
        }

        let url = state.blobs.put(&file_name, &bytes).await?;
        return Ok(Json(json!({ "url": url })));
    }

    Err(ApiError::bad_request("No file provided"))
}
