//! Folder size, listing, move and delete handlers.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use crate::dto::request::MoveFolderRequest;
use crate::dto::response::FolderSizeResponse;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/folders/{id}/size
pub async fn folder_size(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FolderSizeResponse>> {
    let size = state.services.folders.folder_size(id, auth.id()).await?;
    Ok(Json(FolderSizeResponse {
        folder_id: id,
        total_size: size.to_string(),
    }))
}

/// GET /api/folders/{id}/files
pub async fn list_files(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let files = state.services.folders.list_files(id, auth.id()).await?;
    Ok(Json(serde_json::json!({ "files": files })))
}

/// PUT /api/folders/{id}/move
pub async fn move_folder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<MoveFolderRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let folder = state
        .services
        .folders
        .move_folder(id, req.parent_id, auth.id())
        .await?;

    Ok(Json(serde_json::json!({
        "folder": folder,
        "message": "Folder moved successfully.",
    })))
}

/// DELETE /api/folders/{id}
pub async fn delete_folder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let deletion = state.services.folders.delete_folder(id, auth.id()).await?;
    Ok(Json(serde_json::json!({
        "message": "Folder deleted successfully.",
        "deletedFiles": deletion.deleted_files,
        "failedObjects": deletion.failed_objects,
    })))
}
