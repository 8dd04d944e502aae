use axum::extract::{Multipart, Path, State};
use axum::Json;
use bytes::BytesMut;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppQuery, JSend, JSendPaginated, Pagination};
use crate::share::Principal;
use crate::storage::models::FileRecord;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub created_at: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub file: FileResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    #[serde(default)]
    pub expire_days: Option<u32>,
    /// Mint an unlimited-view share link expiring with the file
    #[serde(default)]
    pub create_share: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListFilesParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    20
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppQuery(params): AppQuery<UploadParams>,
    mut multipart: Multipart,
) -> Result<Json<JSend<UploadResponse>>, ApiError> {
    let expire_days = params
        .expire_days
        .unwrap_or(state.config.links.default_expire_days);
    if expire_days == 0 || expire_days > state.config.links.max_expire_days {
        return Err(ApiError::bad_request(format!(
            "expire_days must be between 1 and {}",
            state.config.links.max_expire_days
        )));
    }

    let mut file_data: Option<BytesMut> = None;
    let mut file_name: Option<String> = None;
    let mut file_content_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_content_type = field.content_type().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

                if data.len() as u64 > state.config.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {} bytes",
                        state.config.max_upload_size
                    )));
                }

                let mut buf = BytesMut::with_capacity(data.len());
                buf.extend_from_slice(&data);
                file_data = Some(buf);
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let file_data = file_data.ok_or_else(|| ApiError::bad_request("file field is required"))?;
    let filename = file_name.unwrap_or_else(|| "download.bin".to_string());

    // Determine MIME type: from multipart Content-Type, or guess from
    // filename, or fallback
    let content_type = file_content_type
        .filter(|ct| ct != "application/octet-stream")
        .or_else(|| {
            mime_guess::from_path(&filename)
                .first()
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let size = file_data.len() as u64;
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();
    let bucket = state.config.storage.bucket.clone();
    let object_name = format!("{id}_{}", sanitize_object_name(&filename));

    // Phase 1: store the blob. The metadata row only exists once the bytes
    // are durable.
    state
        .object_store
        .put(&bucket, &object_name, file_data.freeze(), &content_type)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to store file: {e}")))?;

    // Phase 2: write metadata
    let record = FileRecord {
        id: id.clone(),
        filename,
        content_type,
        size,
        owner_id: principal.id.clone(),
        created_at: now,
        expires_at: now + Duration::days(i64::from(expire_days)),
        bucket: bucket.clone(),
        object_name: object_name.clone(),
    };

    if let Err(e) = state.db.put_file(&record) {
        // Best-effort cleanup of the uploaded blob
        let _ = state.object_store.remove(&bucket, &object_name).await;
        return Err(ApiError::internal(e.to_string()));
    }

    let (share_url, token) = if params.create_share {
        let link = state.engine.create_for_upload(&record).await?;
        (Some(state.share_url(&link.token)), Some(link.token))
    } else {
        (None, None)
    };

    tracing::debug!(file_id = %id, owner_id = %principal.id, "Uploaded file");

    Ok(JSend::success(UploadResponse {
        file: file_to_response(&record),
        share_url,
        token,
    }))
}

pub async fn get_file(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let file = state
        .db
        .get_file(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    if !principal.can_manage(&file) {
        return Err(ApiError::forbidden("Access denied"));
    }

    Ok(JSend::success(file_to_response(&file)))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppQuery(params): AppQuery<ListFilesParams>,
) -> Result<Json<JSendPaginated<FileResponse>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let mut files = state
        .db
        .get_files_by_owner(&principal.id)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    // Newest first
    files.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total = files.len() as u64;
    let items: Vec<FileResponse> = files
        .iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .map(file_to_response)
        .collect();

    Ok(JSendPaginated::success(
        items,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total,
        },
    ))
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    let file = state
        .db
        .get_file(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    if !principal.can_manage(&file) {
        return Err(ApiError::forbidden("Access denied"));
    }

    // Best-effort blob removal; the metadata row goes regardless
    if let Err(e) = state
        .object_store
        .remove(&file.bucket, &file.object_name)
        .await
    {
        tracing::warn!(file_id = %id, error = %e, "Failed to delete blob from object storage");
    }

    state
        .db
        .delete_file(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::debug!(file_id = %id, "Deleted file");
    Ok(JSend::success(()))
}

// ============================================================================
// Helpers
// ============================================================================

/// Keep object keys filesystem- and URL-safe regardless of what the client
/// named its file.
fn sanitize_object_name(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn file_to_response(file: &FileRecord) -> FileResponse {
    FileResponse {
        id: file.id.clone(),
        filename: file.filename.clone(),
        content_type: file.content_type.clone(),
        size: file.size,
        created_at: file.created_at.to_rfc3339(),
        expires_at: file.expires_at.to_rfc3339(),
    }
}
