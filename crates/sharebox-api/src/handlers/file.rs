//! Proxied uploads and downloads, used when the object store is not
//! reachable by clients.

use std::path::{Path as FsPath, PathBuf};

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use sharebox_core::error::{AppError, ErrorKind};
use sharebox_core::result::AppResult;
use sharebox_storage::disposition::{content_type_for, encode_filename_for_header, fallback_name};

use crate::dto::request::ObjectQuery;
use crate::dto::response::UploadResponse;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// PUT /api/files/upload?objectName=...
///
/// The body is spooled to the temp directory and then streamed into the
/// store, so memory use does not grow with the upload.
pub async fn upload(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ObjectQuery>,
    body: Body,
) -> ApiResult<Json<UploadResponse>> {
    let object_name = query.require_object_name()?;

    let temp_dir = PathBuf::from(&state.config.server.temp_dir);
    tokio::fs::create_dir_all(&temp_dir).await.map_err(AppError::from)?;
    let spool = temp_dir.join(format!("upload-{}.part", Uuid::new_v4()));

    let result = spool_and_store(
        &state,
        object_name,
        &spool,
        body,
        state.config.server.max_upload_size_bytes,
    )
    .await;

    if let Err(e) = tokio::fs::remove_file(&spool).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %spool.display(), error = %e, "Failed to remove upload spool file");
        }
    }

    let size = result?;
    tracing::info!(object_name, size, "Proxied upload stored");
    Ok(Json(UploadResponse {
        object_name: object_name.to_string(),
        size,
    }))
}

async fn spool_and_store(
    state: &AppState,
    object_name: &str,
    spool: &FsPath,
    body: Body,
    max_bytes: u64,
) -> AppResult<u64> {
    let mut file = tokio::fs::File::create(spool).await?;
    let mut stream = body.into_data_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| AppError::with_source(ErrorKind::TransientIo, "Upload interrupted", e))?;
        written = written.saturating_add(chunk.len() as u64);
        if written > max_bytes {
            return Err(AppError::validation("File size exceeds limit")
                .with_details(serde_json::json!({ "maxFileSize": max_bytes })));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    state
        .services
        .storage
        .provider()
        .put_object_from_path(object_name, spool)
        .await
}

/// GET /api/files/download?objectName=...&fileName=...
pub async fn download(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ObjectQuery>,
) -> ApiResult<Response> {
    let object_name = query.require_object_name()?;
    let file_name = query
        .file_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback_name(object_name));

    let stream = state
        .services
        .storage
        .provider()
        .get_object_stream(object_name)
        .await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type_for(file_name)),
            (header::CONTENT_DISPOSITION, encode_filename_for_header(file_name)),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
