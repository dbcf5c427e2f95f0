//! # sharebox-api
//!
//! HTTP API layer for ShareBox built on Axum.
//!
//! Provides the REST endpoints for presigned and proxied transfers, bulk
//! zip downloads, folder operations and reverse-share uploads, plus
//! middleware (CORS, compression, logging), extractors, DTOs, and error
//! mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, serve, shutdown_signal};
pub use error::{ApiError, ApiResult};
pub use state::AppState;
