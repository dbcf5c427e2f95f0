//! Process-local object store used by tests across the workspace.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use tokio::sync::RwLock;

use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::{ByteStream, CompletedPart, ProviderKind, StorageProvider};

/// Object store held in a hash map. Keys registered with
/// [`MemoryStorageProvider::fail_on`] fail reads and writes with a
/// transient error.
#[derive(Debug, Default)]
pub struct MemoryStorageProvider {
    objects: RwLock<HashMap<String, Bytes>>,
    failing: RwLock<HashSet<String>>,
    uploads: RwLock<HashMap<String, String>>,
    puts: AtomicUsize,
}

impl MemoryStorageProvider {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without counting it as an upload.
    pub async fn insert(&self, object_name: &str, data: impl Into<Bytes>) {
        self.objects
            .write()
            .await
            .insert(object_name.to_string(), data.into());
    }

    /// Make every read or write of `object_name` fail.
    pub async fn fail_on(&self, object_name: &str) {
        self.failing.write().await.insert(object_name.to_string());
    }

    /// Contents of an object.
    pub async fn get(&self, object_name: &str) -> Option<Bytes> {
        self.objects.read().await.get(object_name).cloned()
    }

    /// Number of successful uploads since creation.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    async fn check(&self, object_name: &str) -> AppResult<()> {
        if self.failing.read().await.contains(object_name) {
            return Err(AppError::transient(format!(
                "Simulated failure for {object_name}"
            )));
        }
        Ok(())
    }

    async fn store(&self, object_name: &str, data: Bytes) -> AppResult<()> {
        self.check(object_name).await?;
        self.objects
            .write()
            .await
            .insert(object_name.to_string(), data);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn url(object_name: &str, method: &str, expires_in: u64) -> String {
        format!("memory://bucket/{object_name}?method={method}&expires={expires_in}")
    }
}

#[async_trait]
impl StorageProvider for MemoryStorageProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Memory
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn presigned_put_url(&self, object_name: &str, expires_in: u64) -> AppResult<String> {
        Ok(Self::url(object_name, "PUT", expires_in))
    }

    async fn presigned_get_url(
        &self,
        object_name: &str,
        expires_in: u64,
        _display_name: Option<&str>,
    ) -> AppResult<String> {
        Ok(Self::url(object_name, "GET", expires_in))
    }

    async fn backend_get_url(&self, object_name: &str, expires_in: u64) -> AppResult<String> {
        Ok(Self::url(object_name, "GET", expires_in))
    }

    async fn backend_put_url(&self, object_name: &str, expires_in: u64) -> AppResult<String> {
        Ok(Self::url(object_name, "PUT", expires_in))
    }

    async fn delete_object(&self, object_name: &str) -> AppResult<()> {
        self.check(object_name).await?;
        self.objects.write().await.remove(object_name);
        Ok(())
    }

    async fn file_exists(&self, object_name: &str) -> AppResult<bool> {
        Ok(self.objects.read().await.contains_key(object_name))
    }

    async fn get_object_stream(&self, object_name: &str) -> AppResult<ByteStream> {
        self.check(object_name).await?;
        let data = self
            .get(object_name)
            .await
            .ok_or_else(|| AppError::not_found(format!("Object not found: {object_name}")))?;
        Ok(Box::pin(stream::iter(vec![Ok(data)])))
    }

    async fn put_object(&self, object_name: &str, data: Bytes) -> AppResult<()> {
        self.store(object_name, data).await
    }

    async fn put_object_from_path(&self, object_name: &str, path: &Path) -> AppResult<u64> {
        self.check(object_name).await?;
        let data = tokio::fs::read(path).await?;
        let size = data.len() as u64;
        self.store(object_name, Bytes::from(data)).await?;
        Ok(size)
    }

    async fn create_multipart_upload(&self, object_name: &str) -> AppResult<String> {
        let upload_id = uuid::Uuid::new_v4().to_string();
        self.uploads
            .write()
            .await
            .insert(upload_id.clone(), object_name.to_string());
        Ok(upload_id)
    }

    async fn presigned_part_url(
        &self,
        object_name: &str,
        upload_id: &str,
        part_number: i32,
        expires_in: u64,
    ) -> AppResult<String> {
        Ok(format!(
            "{}&uploadId={upload_id}&partNumber={part_number}",
            Self::url(object_name, "PUT", expires_in)
        ))
    }

    async fn complete_multipart_upload(
        &self,
        object_name: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> AppResult<()> {
        let key = self
            .uploads
            .write()
            .await
            .remove(upload_id)
            .filter(|k| k == object_name)
            .ok_or_else(|| AppError::not_found(format!("Upload {upload_id} not found")))?;
        let manifest = parts
            .iter()
            .map(|p| format!("{}:{}", p.part_number, p.etag))
            .collect::<Vec<_>>()
            .join(",");
        self.store(&key, Bytes::from(manifest)).await
    }

    async fn abort_multipart_upload(&self, _object_name: &str, upload_id: &str) -> AppResult<()> {
        self.uploads.write().await.remove(upload_id);
        Ok(())
    }
}
