//! Route definitions for the ShareBox HTTP API.
//!
//! All routes are organized by domain and mounted under `/api`.

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::handlers;
use crate::state::AppState;

/// Build the API router with every route mounted under `/api`.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(storage_routes())
        .merge(file_routes())
        .merge(bulk_download_routes())
        .merge(folder_routes())
        .merge(reverse_share_routes())
        .merge(health_routes());

    Router::new().nest("/api", api_routes).with_state(state)
}

/// Presigned URLs and object management
fn storage_routes() -> Router<AppState> {
    Router::new()
        .route("/storage/upload-url", get(handlers::storage::upload_url))
        .route("/storage/download-url", get(handlers::storage::download_url))
        .route("/storage/public-url", get(handlers::storage::public_url))
        .route("/storage/object", delete(handlers::storage::delete_object))
        .route("/storage/exists", get(handlers::storage::object_exists))
}

/// Proxied transfers for internal storage
fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/files/upload", put(handlers::file::upload))
        .route("/files/download", get(handlers::file::download))
}

fn bulk_download_routes() -> Router<AppState> {
    Router::new()
        .route("/bulk-download", post(handlers::bulk::bulk_download))
        .route(
            "/bulk-download/folder/{folder_id}/{folder_name}",
            get(handlers::bulk::folder_download),
        )
        .route(
            "/bulk-download/reverse-share",
            post(handlers::bulk::reverse_share_download),
        )
}

fn folder_routes() -> Router<AppState> {
    Router::new()
        .route("/folders/{id}/size", get(handlers::folder::folder_size))
        .route("/folders/{id}/files", get(handlers::folder::list_files))
        .route("/folders/{id}/move", put(handlers::folder::move_folder))
        .route("/folders/{id}", delete(handlers::folder::delete_folder))
}

/// Public upload flow (password in the body) and owner copy
fn reverse_share_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/reverse-shares/alias/{alias}/presigned-url",
            post(handlers::reverse_share::presigned_upload_url),
        )
        .route(
            "/reverse-shares/alias/{alias}/multipart/create",
            post(handlers::reverse_share::create_multipart),
        )
        .route(
            "/reverse-shares/alias/{alias}/multipart/part-url",
            post(handlers::reverse_share::part_url),
        )
        .route(
            "/reverse-shares/alias/{alias}/multipart/complete",
            post(handlers::reverse_share::complete_multipart),
        )
        .route(
            "/reverse-shares/alias/{alias}/multipart/abort",
            post(handlers::reverse_share::abort_multipart),
        )
        .route(
            "/reverse-shares/alias/{alias}/files",
            post(handlers::reverse_share::register_file),
        )
        .route(
            "/reverse-shares/files/{file_id}/copy",
            post(handlers::reverse_share::copy_to_my_files),
        )
}

/// Health check endpoints (no auth required)
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
