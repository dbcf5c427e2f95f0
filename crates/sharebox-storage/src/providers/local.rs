//! Legacy filesystem provider.
//!
//! Objects live as plain files under a root directory, keyed by their
//! relative path. The tree is never reachable by clients directly, so
//! every transfer goes through the backend proxy routes and presigning
//! is not supported.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;

use sharebox_core::error::{AppError, ErrorKind};
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::{ByteStream, CompletedPart, ProviderKind, StorageProvider};

/// Filesystem-backed provider.
#[derive(Debug, Clone)]
pub struct FilesystemStorageProvider {
    root: PathBuf,
}

impl FilesystemStorageProvider {
    /// Create a provider rooted at `root_path`, creating the directory.
    pub async fn new(root_path: impl Into<PathBuf>) -> AppResult<Self> {
        let root = root_path.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// Map an object key to a path below the root. Keys escaping the root
    /// are rejected.
    fn resolve(&self, object_name: &str) -> AppResult<PathBuf> {
        let relative = Path::new(object_name.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || object_name.trim().is_empty() {
            return Err(AppError::validation(format!("Invalid object name: {object_name}")));
        }
        Ok(self.root.join(relative))
    }

    async fn ensure_parent(path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn unsupported(operation: &str) -> AppError {
        AppError::not_implemented(format!(
            "{operation} is not supported by the filesystem provider; use the proxy routes"
        ))
    }
}

#[async_trait]
impl StorageProvider for FilesystemStorageProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Filesystem
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root).await.is_ok_and(|m| m.is_dir()))
    }

    async fn presigned_put_url(&self, _object_name: &str, _expires_in: u64) -> AppResult<String> {
        Err(Self::unsupported("Presigned upload"))
    }

    async fn presigned_get_url(
        &self,
        _object_name: &str,
        _expires_in: u64,
        _display_name: Option<&str>,
    ) -> AppResult<String> {
        Err(Self::unsupported("Presigned download"))
    }

    async fn backend_get_url(&self, _object_name: &str, _expires_in: u64) -> AppResult<String> {
        Err(Self::unsupported("Presigned download"))
    }

    async fn backend_put_url(&self, _object_name: &str, _expires_in: u64) -> AppResult<String> {
        Err(Self::unsupported("Presigned upload"))
    }

    async fn delete_object(&self, object_name: &str) -> AppResult<()> {
        let path = self.resolve(object_name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete file: {object_name}"),
                e,
            )),
        }
    }

    async fn file_exists(&self, object_name: &str) -> AppResult<bool> {
        let path = self.resolve(object_name)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_object_stream(&self, object_name: &str) -> AppResult<ByteStream> {
        let path = self.resolve(object_name)?;
        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Object not found: {object_name}"))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to open file: {object_name}"),
                    e,
                )
            }
        })?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn put_object(&self, object_name: &str, data: Bytes) -> AppResult<()> {
        let path = self.resolve(object_name)?;
        Self::ensure_parent(&path).await?;
        fs::write(&path, &data).await?;
        debug!(object_name, bytes = data.len(), "Wrote file");
        Ok(())
    }

    async fn put_object_from_path(&self, object_name: &str, source: &Path) -> AppResult<u64> {
        let path = self.resolve(object_name)?;
        Self::ensure_parent(&path).await?;
        let bytes = fs::copy(source, &path).await?;
        debug!(object_name, bytes, "Copied file into storage root");
        Ok(bytes)
    }

    async fn create_multipart_upload(&self, _object_name: &str) -> AppResult<String> {
        Err(Self::unsupported("Multipart upload"))
    }

    async fn presigned_part_url(
        &self,
        _object_name: &str,
        _upload_id: &str,
        _part_number: i32,
        _expires_in: u64,
    ) -> AppResult<String> {
        Err(Self::unsupported("Multipart upload"))
    }

    async fn complete_multipart_upload(
        &self,
        _object_name: &str,
        _upload_id: &str,
        _parts: Vec<CompletedPart>,
    ) -> AppResult<()> {
        Err(Self::unsupported("Multipart upload"))
    }

    async fn abort_multipart_upload(&self, _object_name: &str, _upload_id: &str) -> AppResult<()> {
        Err(Self::unsupported("Multipart upload"))
    }
}
