//! Direct presigned URLs versus backend-proxied paths.
//!
//! An internally provisioned store listens on an address clients cannot
//! reach, so transfers are routed through `/files/upload` and
//! `/files/download` on this server. External stores hand out presigned
//! URLs directly. The decision is recomputed on every call.

use std::sync::Arc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;

use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::StorageProvider;

/// Raised when internal mode must mint a public link but `STORAGE_URL`
/// is not configured.
pub const MISSING_STORAGE_URL: &str = "STORAGE_URL environment variable is required when using \
     internal storage (ENABLE_S3=false). Set STORAGE_URL to your public storage URL with \
     protocol (e.g., https://files.example.com or http://192.168.1.100:9379).";

/// Characters left as-is in query values (same set as `encodeURIComponent`).
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// How a client reaches the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// Straight to the object store with a presigned URL.
    Direct,
    /// Through this server's proxy routes.
    Proxied,
}

/// A URL (absolute or server-relative) plus how it is served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferUrl {
    /// Presigned URL or proxy path.
    pub url: String,
    /// Delivery mode.
    pub delivery: Delivery,
}

impl TransferUrl {
    /// Whether the URL points at this server.
    pub fn is_proxied(&self) -> bool {
        self.delivery == Delivery::Proxied
    }
}

/// Chooses between presigned URLs and proxy paths.
#[derive(Debug, Clone)]
pub struct UrlStrategy {
    provider: Arc<dyn StorageProvider>,
    is_internal: bool,
    reachable_override: Option<bool>,
    public_url: Option<String>,
    proxy_prefix: String,
}

impl UrlStrategy {
    /// Create a strategy. `reachable_override` replaces the inference from
    /// `is_internal` when set.
    pub fn new(
        provider: Arc<dyn StorageProvider>,
        is_internal: bool,
        reachable_override: Option<bool>,
        public_url: Option<String>,
    ) -> Self {
        Self {
            provider,
            is_internal,
            reachable_override,
            public_url: public_url.filter(|u| !u.trim().is_empty()),
            proxy_prefix: "/api".to_string(),
        }
    }

    /// Path prefix under which the proxy routes are mounted.
    pub fn with_proxy_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.proxy_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    /// Current delivery mode.
    pub fn delivery(&self) -> Delivery {
        if self.reachable_override.unwrap_or(!self.is_internal) {
            Delivery::Direct
        } else {
            Delivery::Proxied
        }
    }

    /// Where a client should upload `object_name`.
    pub async fn upload_url(&self, object_name: &str, expires_in: u64) -> AppResult<TransferUrl> {
        match self.delivery() {
            Delivery::Proxied => Ok(TransferUrl {
                url: format!(
                    "{}/files/upload?objectName={}",
                    self.proxy_prefix,
                    encode(object_name)
                ),
                delivery: Delivery::Proxied,
            }),
            Delivery::Direct => Ok(TransferUrl {
                url: self.provider.presigned_put_url(object_name, expires_in).await?,
                delivery: Delivery::Direct,
            }),
        }
    }

    /// Where a client should download `object_name`.
    pub async fn download_url(
        &self,
        object_name: &str,
        expires_in: u64,
        file_name: Option<&str>,
    ) -> AppResult<TransferUrl> {
        match self.delivery() {
            Delivery::Proxied => {
                let mut url = format!(
                    "{}/files/download?objectName={}",
                    self.proxy_prefix,
                    encode(object_name)
                );
                if let Some(name) = file_name.filter(|n| !n.is_empty()) {
                    url.push_str("&fileName=");
                    url.push_str(&encode(name));
                }
                Ok(TransferUrl {
                    url,
                    delivery: Delivery::Proxied,
                })
            }
            Delivery::Direct => Ok(TransferUrl {
                url: self
                    .provider
                    .presigned_get_url(object_name, expires_in, file_name)
                    .await?,
                delivery: Delivery::Direct,
            }),
        }
    }

    /// Public base URL of the storage endpoint. Mandatory in internal mode
    /// and checked only when first needed.
    pub fn public_base_url(&self) -> AppResult<Option<&str>> {
        match (self.is_internal, self.public_url.as_deref()) {
            (true, None) => Err(AppError::configuration(MISSING_STORAGE_URL)),
            (_, url) => Ok(url),
        }
    }

    /// A presigned download link usable from outside the deployment, for
    /// example in e-mails.
    pub async fn public_download_url(
        &self,
        object_name: &str,
        expires_in: u64,
        file_name: Option<&str>,
    ) -> AppResult<String> {
        self.public_base_url()?;
        self.provider
            .presigned_get_url(object_name, expires_in, file_name)
            .await
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryStorageProvider;
    use sharebox_core::error::ErrorKind;

    fn strategy(is_internal: bool, reachable: Option<bool>, public_url: Option<&str>) -> UrlStrategy {
        UrlStrategy::new(
            Arc::new(MemoryStorageProvider::new()),
            is_internal,
            reachable,
            public_url.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn test_internal_mode_proxies() {
        let s = strategy(true, None, None);
        let upload = s.upload_url("user 1/a&b.txt", 3600).await.unwrap();
        assert!(upload.is_proxied());
        assert_eq!(upload.url, "/api/files/upload?objectName=user%201%2Fa%26b.txt");

        let download = s.download_url("u/a.txt", 3600, Some("a b.txt")).await.unwrap();
        assert_eq!(
            download.url,
            "/api/files/download?objectName=u%2Fa.txt&fileName=a%20b.txt"
        );
    }

    #[tokio::test]
    async fn test_external_mode_presigns() {
        let s = strategy(false, None, None);
        let upload = s.upload_url("u/a.txt", 60).await.unwrap();
        assert_eq!(upload.delivery, Delivery::Direct);
        assert!(upload.url.starts_with("memory://bucket/u/a.txt?method=PUT"));
    }

    #[tokio::test]
    async fn test_explicit_reachability_overrides_mode() {
        assert_eq!(strategy(true, Some(true), None).delivery(), Delivery::Direct);
        assert_eq!(strategy(false, Some(false), None).delivery(), Delivery::Proxied);
        let s = strategy(false, Some(false), None).with_proxy_prefix("/v2/");
        let upload = s.upload_url("k", 60).await.unwrap();
        assert_eq!(upload.url, "/v2/files/upload?objectName=k");
    }

    #[tokio::test]
    async fn test_public_link_without_storage_url_is_configuration_error() {
        let s = strategy(true, None, None);
        let err = s.public_download_url("u/a.txt", 60, None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.message.contains("STORAGE_URL"));

        // Proxied transfers keep working without it.
        assert!(s.download_url("u/a.txt", 60, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_public_link_with_storage_url() {
        let s = strategy(true, None, Some("https://files.example.com"));
        assert_eq!(s.public_base_url().unwrap(), Some("https://files.example.com"));
        assert!(s.public_download_url("u/a.txt", 60, None).await.is_ok());
    }
}
