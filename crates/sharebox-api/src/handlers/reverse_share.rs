//! Public reverse-share upload endpoints and the owner-side copy.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use sharebox_entity::share::ReverseShareFile;
use sharebox_service::share::{MultipartUpload, PresignedUpload};

use crate::dto::request::{
    AbortMultipartRequest, CompleteMultipartRequest, CreateMultipartRequest, PartUrlRequest,
    PresignedUploadRequest, RegisterFileRequest,
};
use crate::dto::response::MessageResponse;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/reverse-shares/alias/{alias}/presigned-url
pub async fn presigned_upload_url(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    Json(req): Json<PresignedUploadRequest>,
) -> ApiResult<Json<PresignedUpload>> {
    let signed = state
        .services
        .reverse_shares
        .presigned_upload_url(&alias, &req.object_name, req.password.as_deref())
        .await?;
    Ok(Json(signed))
}

/// POST /api/reverse-shares/alias/{alias}/multipart/create
pub async fn create_multipart(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    Json(req): Json<CreateMultipartRequest>,
) -> ApiResult<Json<MultipartUpload>> {
    let upload = state
        .services
        .reverse_shares
        .create_multipart(&alias, &req.filename, &req.extension, req.password.as_deref())
        .await?;
    Ok(Json(upload))
}

/// POST /api/reverse-shares/alias/{alias}/multipart/part-url
pub async fn part_url(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    Json(req): Json<PartUrlRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let url = state
        .services
        .reverse_shares
        .part_url(
            &alias,
            &req.object_name,
            &req.upload_id,
            req.part_number,
            req.password.as_deref(),
        )
        .await?;
    Ok(Json(serde_json::json!({
        "url": url,
        "partNumber": req.part_number,
    })))
}

/// POST /api/reverse-shares/alias/{alias}/multipart/complete
pub async fn complete_multipart(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    Json(req): Json<CompleteMultipartRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .services
        .reverse_shares
        .complete_multipart(
            &alias,
            &req.object_name,
            &req.upload_id,
            req.parts,
            req.password.as_deref(),
        )
        .await?;
    Ok(Json(serde_json::json!({
        "message": "Multipart upload completed",
        "objectName": req.object_name,
    })))
}

/// POST /api/reverse-shares/alias/{alias}/multipart/abort
pub async fn abort_multipart(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    Json(req): Json<AbortMultipartRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .services
        .reverse_shares
        .abort_multipart(
            &alias,
            &req.object_name,
            &req.upload_id,
            req.password.as_deref(),
        )
        .await?;
    Ok(Json(MessageResponse::new("Multipart upload aborted")))
}

/// POST /api/reverse-shares/alias/{alias}/files
pub async fn register_file(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    Json(req): Json<RegisterFileRequest>,
) -> ApiResult<(StatusCode, Json<ReverseShareFile>)> {
    let file = state
        .services
        .reverse_shares
        .register_file_upload(&alias, req.upload, req.password.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(file)))
}

/// POST /api/reverse-shares/files/{file_id}/copy
pub async fn copy_to_my_files(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(file_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let file = state
        .services
        .reverse_shares
        .copy_to_user_files(file_id, auth.id())
        .await?;
    Ok(Json(serde_json::json!({
        "file": file,
        "message": "File copied to your files successfully",
    })))
}
