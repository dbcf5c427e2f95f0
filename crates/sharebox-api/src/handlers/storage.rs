//! Presigned URL and object management handlers.

use axum::Json;
use axum::extract::{Query, State};

use sharebox_core::error::AppError;

use crate::dto::request::ObjectQuery;
use crate::dto::response::{DeleteObjectResponse, ExistsResponse, TransferUrlResponse};
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

fn expires_in(state: &AppState, query: &ObjectQuery) -> u64 {
    query
        .expires_in
        .filter(|secs| *secs > 0)
        .unwrap_or_else(|| state.services.storage.presigned_expiration())
}

/// GET /api/storage/upload-url?objectName=...&expiresIn=...
pub async fn upload_url(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ObjectQuery>,
) -> ApiResult<Json<TransferUrlResponse>> {
    let object_name = query.require_object_name()?;
    let expires = expires_in(&state, &query);

    let transfer = state.services.urls.upload_url(object_name, expires).await?;
    Ok(Json(TransferUrlResponse::new(transfer, object_name, expires)))
}

/// GET /api/storage/download-url?objectName=...&expiresIn=...&fileName=...
pub async fn download_url(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ObjectQuery>,
) -> ApiResult<Json<TransferUrlResponse>> {
    let object_name = query.require_object_name()?;
    let expires = expires_in(&state, &query);

    if !state.services.storage.provider().file_exists(object_name).await? {
        return Err(AppError::not_found("File not found").into());
    }

    let transfer = state
        .services
        .urls
        .download_url(object_name, expires, query.file_name.as_deref())
        .await?;
    Ok(Json(TransferUrlResponse::new(transfer, object_name, expires)))
}

/// GET /api/storage/public-url?objectName=...&expiresIn=...&fileName=...
///
/// A presigned link meant for recipients outside the deployment. In
/// internal mode this requires `STORAGE_URL`.
pub async fn public_url(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ObjectQuery>,
) -> ApiResult<Json<TransferUrlResponse>> {
    let object_name = query.require_object_name()?;
    let expires = expires_in(&state, &query);

    let url = state
        .services
        .urls
        .public_download_url(object_name, expires, query.file_name.as_deref())
        .await?;
    Ok(Json(TransferUrlResponse {
        url,
        object_name: object_name.to_string(),
        expires_in: expires,
        proxied: false,
    }))
}

/// DELETE /api/storage/object?objectName=...
pub async fn delete_object(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ObjectQuery>,
) -> ApiResult<Json<DeleteObjectResponse>> {
    let object_name = query.require_object_name()?;
    state.services.storage.provider().delete_object(object_name).await?;

    tracing::info!(object_name, "Object deleted");
    Ok(Json(DeleteObjectResponse {
        message: "Object deleted successfully".to_string(),
        object_name: object_name.to_string(),
    }))
}

/// GET /api/storage/exists?objectName=...
pub async fn object_exists(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ObjectQuery>,
) -> ApiResult<Json<ExistsResponse>> {
    let object_name = query.require_object_name()?;
    let exists = state.services.storage.provider().file_exists(object_name).await?;

    Ok(Json(ExistsResponse {
        exists,
        object_name: object_name.to_string(),
    }))
}
