//! Placeholder selected when the object store cannot be configured.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;

use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::{ByteStream, CompletedPart, ProviderKind, StorageProvider};

/// Fails every operation with `ServiceUnavailable` before any I/O.
#[derive(Debug, Clone)]
pub struct UnconfiguredProvider {
    reason: String,
}

impl UnconfiguredProvider {
    /// Remember why configuration failed, for logs and health output.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Why the object store is unavailable.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn fail<T>(&self) -> AppResult<T> {
        Err(AppError::provider_unavailable()
            .with_details(serde_json::json!({ "reason": self.reason })))
    }
}

#[async_trait]
impl StorageProvider for UnconfiguredProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Unconfigured
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(false)
    }

    async fn presigned_put_url(&self, _: &str, _: u64) -> AppResult<String> {
        self.fail()
    }

    async fn presigned_get_url(&self, _: &str, _: u64, _: Option<&str>) -> AppResult<String> {
        self.fail()
    }

    async fn backend_get_url(&self, _: &str, _: u64) -> AppResult<String> {
        self.fail()
    }

    async fn backend_put_url(&self, _: &str, _: u64) -> AppResult<String> {
        self.fail()
    }

    async fn delete_object(&self, _: &str) -> AppResult<()> {
        self.fail()
    }

    async fn file_exists(&self, _: &str) -> AppResult<bool> {
        self.fail()
    }

    async fn get_object_stream(&self, _: &str) -> AppResult<ByteStream> {
        self.fail()
    }

    async fn put_object(&self, _: &str, _: Bytes) -> AppResult<()> {
        self.fail()
    }

    async fn put_object_from_path(&self, _: &str, _: &Path) -> AppResult<u64> {
        self.fail()
    }

    async fn create_multipart_upload(&self, _: &str) -> AppResult<String> {
        self.fail()
    }

    async fn presigned_part_url(&self, _: &str, _: &str, _: i32, _: u64) -> AppResult<String> {
        self.fail()
    }

    async fn complete_multipart_upload(
        &self,
        _: &str,
        _: &str,
        _: Vec<CompletedPart>,
    ) -> AppResult<()> {
        self.fail()
    }

    async fn abort_multipart_upload(&self, _: &str, _: &str) -> AppResult<()> {
        self.fail()
    }
}
