use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{ApiError, AppQuery};
use crate::object_store::ObjectStat;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    /// Replaces the display filename in the response headers, never the
    /// stored object key
    #[serde(default)]
    pub filename: Option<String>,
}

/// Serve a gated download.
/// Route: GET /download/:token
///
/// The view is consumed before the first byte is sent, so a mid-stream
/// disconnect still spends it. A blob missing despite live metadata degrades
/// to the same 404 as an unknown token; only a stream-open failure after a
/// successful stat surfaces as retryable 503.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    AppQuery(params): AppQuery<DownloadParams>,
) -> Result<Response, ApiError> {
    let (_link, file) = state.engine.resolve_and_consume(&token).await?;

    let stat = state
        .object_store
        .stat(&file.bucket, &file.object_name)
        .await
        .map_err(|e| {
            tracing::warn!(
                file_id = %file.id,
                bucket = %file.bucket,
                object_name = %file.object_name,
                error = %e,
                "Blob missing or unreadable for live file record"
            );
            ApiError::not_found("File not found")
        })?;

    let stream = state
        .object_store
        .open_stream(&file.bucket, &file.object_name)
        .await
        .map_err(|e| {
            tracing::error!(file_id = %file.id, error = %e, "Failed to open blob stream");
            ApiError::unavailable("Storage is temporarily unavailable")
        })?;

    let display_name = params
        .filename
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| file.filename.clone());

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        resolve_content_type(&file.content_type, &stat)
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(stat.size));
    if let Ok(value) = content_disposition(&display_name).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );

    Ok((StatusCode::OK, headers, Body::from_stream(stream)).into_response())
}

/// Recorded type, then the store's reported type, then generic binary.
fn resolve_content_type(recorded: &str, stat: &ObjectStat) -> String {
    if !recorded.is_empty() {
        return recorded.to_string();
    }
    stat.content_type
        .clone()
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Two-part attachment disposition per RFC 6266/5987: a quoted ASCII
/// fallback for legacy clients plus a percent-encoded UTF-8 `filename*`
/// parameter that round-trips non-ASCII names.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control() && *c != '"' && *c != '\\')
        .collect();
    let fallback = if fallback.is_empty() {
        "download.bin".to_string()
    } else {
        fallback
    };

    let encoded = urlencoding::encode(filename);
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}
