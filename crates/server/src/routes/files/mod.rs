use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{Attachment, AuthUser};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub id: String,
    pub url: String,
    pub content_type: String,
    pub size: i64,
}

/// Extension taken from the client filename, if it looks sane.
fn stored_extension(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin")
}

fn stored_path(state: &AppState, id: &str, filename: &str) -> std::path::PathBuf {
    std::path::Path::new(&state.config.upload_dir)
        .join(format!("{}.{}", id, stored_extension(filename)))
}

/// POST /api/upload
pub async fn upload(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed upload: {}", e)))?
        .ok_or_else(|| ApiError::Validation("No file provided".into()))?;

    let original_filename = field.file_name().unwrap_or("image").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    if !content_type.starts_with("image/") {
        return Err(ApiError::Validation("Only image uploads are accepted".into()));
    }

    let data = field.bytes().await.map_err(|e| {
        if e.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge("File too large".into())
        } else {
            ApiError::Validation("Failed to read file".into())
        }
    })?;

    if data.len() as u64 > state.config.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "File too large. Max size: {} MB",
            state.config.max_upload_bytes / 1_048_576
        )));
    }
    if data.is_empty() {
        return Err(ApiError::Validation("File is empty".into()));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let size = data.len() as i64;

    tokio::fs::create_dir_all(&state.config.upload_dir).await?;
    let file_path = stored_path(&state, &id, &original_filename);
    tokio::fs::write(&file_path, &data).await?;

    let inserted = sqlx::query(
        r#"INSERT INTO attachments (id, uploader_id, filename, content_type, size, created_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(&user.id)
    .bind(&original_filename)
    .bind(&content_type)
    .bind(size)
    .bind(db::timestamp())
    .execute(&state.db)
    .await;

    if let Err(e) = inserted {
        let _ = tokio::fs::remove_file(&file_path).await;
        return Err(e.into());
    }

    tracing::debug!("User {} uploaded {} ({} bytes)", user.id, id, size);

    Ok(Json(UploadResponse {
        url: state.config.file_url(&id),
        id,
        content_type,
        size,
    }))
}

/// GET /api/files/{id}
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let attachment = sqlx::query_as::<_, Attachment>("SELECT * FROM attachments WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("File not found".into()))?;

    let file = tokio::fs::File::open(stored_path(&state, &id, &attachment.filename))
        .await
        .map_err(|_| ApiError::NotFound("File not found on disk".into()))?;

    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        [
            (header::CONTENT_TYPE, attachment.content_type),
            (header::CONTENT_DISPOSITION, "inline".to_string()),
            (
                header::CACHE_CONTROL,
                "public, max-age=31536000, immutable".to_string(),
            ),
        ],
        body,
    ))
}
