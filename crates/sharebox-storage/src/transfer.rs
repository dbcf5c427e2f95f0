//! Server-side object transfers.
//!
//! Used to read entries for archives and to copy objects between keys
//! (reverse-share files into the owner's files). Against an object store
//! the bytes travel through short-lived presigned URLs; other providers
//! are read and written directly.

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use reqwest::StatusCode;
use tracing::{debug, warn};

use sharebox_core::error::{AppError, ErrorKind};
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::StorageProvider;

use crate::tls;

/// Lifetime of the presigned URLs minted for a single transfer.
pub const TRANSFER_URL_EXPIRY_SECS: u64 = 300;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(160 * 60);

/// Exponential backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

fn is_retryable(err: &AppError) -> bool {
    !matches!(
        err.kind,
        ErrorKind::NotFound
            | ErrorKind::Validation
            | ErrorKind::Authorization
            | ErrorKind::Configuration
            | ErrorKind::ServiceUnavailable
            | ErrorKind::NotImplemented
    )
}

/// Run `op` until it succeeds, fails permanently, or the attempts run out.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts && is_retryable(&e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transfer attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Reads whole objects and copies objects between keys.
#[async_trait]
pub trait ObjectTransfer: Send + Sync + Debug + 'static {
    /// Read an object into memory.
    async fn fetch(&self, object_name: &str) -> AppResult<Bytes>;

    /// Copy `source` to `target`, returning the number of bytes copied.
    async fn copy(&self, source: &str, target: &str) -> AppResult<u64>;
}

/// Transfers through presigned URLs of the internal client.
#[derive(Debug, Clone)]
pub struct PresignedTransfer {
    provider: Arc<dyn StorageProvider>,
    download: reqwest::Client,
    upload: reqwest::Client,
}

impl PresignedTransfer {
    /// Build the HTTP clients. Honors the process-wide TLS relaxation.
    pub fn new(provider: Arc<dyn StorageProvider>) -> AppResult<Self> {
        Ok(Self {
            provider,
            download: tls::http_client(Some(DOWNLOAD_TIMEOUT))?,
            upload: tls::http_client(Some(UPLOAD_TIMEOUT))?,
        })
    }

    async fn open(&self, object_name: &str) -> AppResult<reqwest::Response> {
        let url = self
            .provider
            .backend_get_url(object_name, TRANSFER_URL_EXPIRY_SECS)
            .await?;
        let response = self
            .download
            .get(&url)
            .send()
            .await
            .map_err(|e| http_error("download", object_name, e))?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(AppError::not_found(format!(
                "Object not found: {object_name}"
            ))),
            status if !status.is_success() => Err(AppError::transient(format!(
                "Failed to download {object_name}: HTTP {status}"
            ))),
            _ => Ok(response),
        }
    }
}

fn http_error(action: &str, object_name: &str, err: reqwest::Error) -> AppError {
    AppError::with_source(
        ErrorKind::TransientIo,
        format!("Failed to {action} {object_name}"),
        err,
    )
}

#[async_trait]
impl ObjectTransfer for PresignedTransfer {
    async fn fetch(&self, object_name: &str) -> AppResult<Bytes> {
        self.open(object_name)
            .await?
            .bytes()
            .await
            .map_err(|e| http_error("read", object_name, e))
    }

    async fn copy(&self, source: &str, target: &str) -> AppResult<u64> {
        let response = self.open(source).await?;
        let length = response.content_length();

        let url = self
            .provider
            .backend_put_url(target, TRANSFER_URL_EXPIRY_SECS)
            .await?;
        let mut request = self
            .upload
            .put(&url)
            .body(reqwest::Body::wrap_stream(response.bytes_stream()));
        if let Some(length) = length {
            request = request.header(reqwest::header::CONTENT_LENGTH, length);
        }

        let uploaded = request
            .send()
            .await
            .map_err(|e| http_error("upload", target, e))?;
        if !uploaded.status().is_success() {
            return Err(AppError::transient(format!(
                "Failed to upload {target}: HTTP {}",
                uploaded.status()
            )));
        }

        debug!(source, target, bytes = ?length, "Copied object");
        Ok(length.unwrap_or_default())
    }
}

/// Transfers through the provider's own read and write calls.
#[derive(Debug, Clone)]
pub struct DirectTransfer {
    provider: Arc<dyn StorageProvider>,
}

impl DirectTransfer {
    /// Wrap a provider.
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ObjectTransfer for DirectTransfer {
    async fn fetch(&self, object_name: &str) -> AppResult<Bytes> {
        let buffer = self
            .provider
            .get_object_stream(object_name)
            .await?
            .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await?;
        Ok(buffer.freeze())
    }

    async fn copy(&self, source: &str, target: &str) -> AppResult<u64> {
        let data = self.fetch(source).await?;
        let length = data.len() as u64;
        self.provider.put_object(target, data).await?;
        debug!(source, target, bytes = length, "Copied object");
        Ok(length)
    }
}
