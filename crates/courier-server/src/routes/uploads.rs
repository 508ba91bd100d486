use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use chrono::Utc;
use courier_core::attachment::{file_name_from_url, unique_file_name};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

struct Upload {
    name: String,
    content_type: String,
    data: Bytes,
}

/// POST /api/upload: multipart field `files`, stored under unique names.
pub async fn upload_files(
    State(app): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    let limits = &app.config.storage;
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.body_text()))?
    {
        if field.name() != Some("files") {
            continue;
        }
        let original = field.file_name().unwrap_or("file").to_string();
        let content_type = match field.content_type() {
            Some(ct) if ct != "application/octet-stream" => ct.to_string(),
            _ => mime_guess::from_path(&original)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;

        if uploads.len() >= limits.max_files {
            return Err(AppError::bad_request(format!(
                "at most {} files per upload",
                limits.max_files
            )));
        }
        if data.len() > limits.max_file_bytes {
            return Err(AppError::bad_request(format!(
                "{original} exceeds {} bytes",
                limits.max_file_bytes
            )));
        }
        uploads.push(Upload {
            name: unique_file_name(&original, Utc::now(), &mut rand::thread_rng()),
            content_type,
            data,
        });
    }

    if uploads.is_empty() {
        return Err(AppError::bad_request("No files uploaded"));
    }

    let store = &app.attachments;
    let urls = futures::future::try_join_all(
        uploads
            .into_iter()
            .map(|u| async move { store.put(&u.name, &u.content_type, u.data).await }),
    )
    .await?;
    tracing::info!(count = urls.len(), storage = store.name(), "attachments stored");

    Ok(Json(serde_json::json!({
        "success": true,
        "urls": urls,
    })))
}

#[derive(Deserialize)]
pub struct DeleteBody {
    url: Option<String>,
}

/// POST /api/delete: remove the file named by the last segment of `url`.
pub async fn delete_file(
    State(app): State<AppState>,
    payload: Result<Json<DeleteBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(body) = payload.map_err(AppError::rejected)?;
    let url = body
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("File URL is required"))?;
    let name = file_name_from_url(&url)?;
    app.attachments.delete(&name).await?;
    tracing::info!(file = %name, "attachment deleted");
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "File deleted successfully",
    })))
}

/// GET /api/uploads: stored attachments.
pub async fn list_files(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let files = app.attachments.list().await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "files": files,
    })))
}
