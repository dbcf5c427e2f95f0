//! Streamed zip downloads.

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use sharebox_service::ArchiveEntry;
use sharebox_service::archive::archive_file_name;
use sharebox_storage::disposition::encode_filename_for_header;

use crate::dto::request::{BulkDownloadRequest, ReverseShareBulkDownloadRequest};
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

fn zip_response(state: &AppState, entries: Vec<ArchiveEntry>, name: &str) -> Response {
    let file_name = archive_file_name(name);
    tracing::info!(entries = entries.len(), file_name = %file_name, "Streaming archive");

    let stream = state.services.archives.stream(entries);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, encode_filename_for_header(&file_name)),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

/// POST /api/bulk-download
pub async fn bulk_download(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<BulkDownloadRequest>,
) -> ApiResult<Response> {
    let entries = state
        .services
        .archives
        .resolve_entries(&req.file_ids, &req.folder_ids, auth.id())
        .await?;

    Ok(zip_response(
        &state,
        entries,
        req.zip_name.as_deref().unwrap_or_default(),
    ))
}

/// GET /api/bulk-download/folder/{folder_id}/{folder_name}
pub async fn folder_download(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((folder_id, folder_name)): Path<(Uuid, String)>,
) -> ApiResult<Response> {
    let entries = state
        .services
        .archives
        .folder_entries(folder_id, auth.id())
        .await?;

    Ok(zip_response(&state, entries, &folder_name))
}

/// POST /api/bulk-download/reverse-share
pub async fn reverse_share_download(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ReverseShareBulkDownloadRequest>,
) -> ApiResult<Response> {
    let entries = state
        .services
        .reverse_shares
        .archive_entries(&req.file_ids, auth.id())
        .await?;

    Ok(zip_response(
        &state,
        entries,
        req.zip_name.as_deref().unwrap_or_default(),
    ))
}
