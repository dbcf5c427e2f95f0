//! Storage provider trait for the object lifecycle.

use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// A byte stream type used for reading object contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// The closed set of provider variants, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// S3-compatible object store.
    ObjectStore,
    /// Legacy local filesystem tree.
    Filesystem,
    /// Credentials were incomplete; every operation fails fast.
    Unconfigured,
    /// Process-local store used by tests.
    Memory,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ObjectStore => write!(f, "s3"),
            Self::Filesystem => write!(f, "filesystem"),
            Self::Unconfigured => write!(f, "unconfigured"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// A part uploaded during a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    /// 1-based part number.
    #[serde(rename = "partNumber")]
    pub part_number: i32,
    /// ETag returned by the store for the part.
    #[serde(rename = "eTag", alias = "etag", alias = "ETag")]
    pub etag: String,
}

/// Trait for object storage backends.
///
/// Implemented in `sharebox-storage` by the S3 provider, the legacy
/// filesystem provider, and an unconfigured placeholder. Object names are
/// opaque keys; callers mint a fresh key for every upload.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Which variant this provider is.
    fn kind(&self) -> ProviderKind;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// URL allowing a client to PUT exactly `object_name` for `expires_in` seconds.
    async fn presigned_put_url(&self, object_name: &str, expires_in: u64) -> AppResult<String>;

    /// URL allowing a client to GET `object_name`, with download headers
    /// derived from `display_name` (or the last key segment).
    async fn presigned_get_url(
        &self,
        object_name: &str,
        expires_in: u64,
        display_name: Option<&str>,
    ) -> AppResult<String>;

    /// GET URL reachable from this server (signed against the internal
    /// endpoint), used for server-side transfers.
    async fn backend_get_url(&self, object_name: &str, expires_in: u64) -> AppResult<String>;

    /// PUT URL reachable from this server, used for server-side transfers.
    async fn backend_put_url(&self, object_name: &str, expires_in: u64) -> AppResult<String>;

    /// Delete an object. Deleting an absent key succeeds.
    async fn delete_object(&self, object_name: &str) -> AppResult<()>;

    /// Whether the object exists. A 404 from the store is `Ok(false)`.
    async fn file_exists(&self, object_name: &str) -> AppResult<bool>;

    /// Stream an object's bytes. Absent objects yield `NotFound`.
    async fn get_object_stream(&self, object_name: &str) -> AppResult<ByteStream>;

    /// Store a small object held in memory.
    async fn put_object(&self, object_name: &str, data: Bytes) -> AppResult<()>;

    /// Stream a local file into the store, returning the bytes written.
    async fn put_object_from_path(&self, object_name: &str, path: &Path) -> AppResult<u64>;

    /// Start a multipart upload and return its upload id.
    async fn create_multipart_upload(&self, object_name: &str) -> AppResult<String>;

    /// URL for uploading one part of a multipart upload.
    async fn presigned_part_url(
        &self,
        object_name: &str,
        upload_id: &str,
        part_number: i32,
        expires_in: u64,
    ) -> AppResult<String>;

    /// Assemble the uploaded parts into the final object.
    async fn complete_multipart_upload(
        &self,
        object_name: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> AppResult<()>;

    /// Abort a multipart upload and discard its parts.
    async fn abort_multipart_upload(&self, object_name: &str, upload_id: &str) -> AppResult<()>;
}
