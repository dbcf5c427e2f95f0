//! Storage manager: selects the one provider for the process and hands
//! out the URL strategy and transfer helpers built on top of it.

use std::sync::Arc;

use tracing::{error, info, warn};

use sharebox_core::config::storage::StorageSettings;
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::{ProviderKind, StorageProvider};

use crate::providers::{FilesystemStorageProvider, S3StorageProvider, UnconfiguredProvider};
use crate::resolver::{self, ConfigSource};
use crate::strategy::UrlStrategy;
use crate::transfer::{DirectTransfer, ObjectTransfer, PresignedTransfer};

/// Outcome of provider selection.
#[derive(Debug, Clone)]
pub struct ProviderSelection {
    /// The selected provider.
    pub provider: Arc<dyn StorageProvider>,
    /// Internally provisioned object store (`ENABLE_S3` unset).
    pub is_internal: bool,
    /// Where the object-store settings came from, if one was built.
    pub source: Option<ConfigSource>,
    /// Why no usable provider exists.
    pub unavailable_reason: Option<String>,
}

/// Pick the provider for the given settings. This is the only place that
/// branches on the storage mode.
pub async fn build_provider(settings: &StorageSettings) -> ProviderSelection {
    if let Some(root) = settings.filesystem_root.as_deref() {
        return match FilesystemStorageProvider::new(root).await {
            Ok(provider) => {
                info!(root, "Using filesystem storage");
                ProviderSelection {
                    provider: Arc::new(provider),
                    is_internal: true,
                    source: None,
                    unavailable_reason: None,
                }
            }
            Err(e) => unconfigured(e.to_string()),
        };
    }

    let resolved = resolver::resolve(settings).await;
    let is_internal = !settings.enable_s3;
    match S3StorageProvider::connect(&resolved.config, is_internal, settings.public_url.clone()) {
        Ok(provider) => ProviderSelection {
            provider: Arc::new(provider),
            is_internal,
            source: Some(resolved.source),
            unavailable_reason: None,
        },
        Err(e) => {
            error!(error = %e, "Failed to initialize object storage");
            unconfigured(e.to_string())
        }
    }
}

fn unconfigured(reason: String) -> ProviderSelection {
    ProviderSelection {
        provider: Arc::new(UnconfiguredProvider::new(reason.clone())),
        is_internal: false,
        source: None,
        unavailable_reason: Some(reason),
    }
}

/// Process-wide storage handle.
#[derive(Debug, Clone)]
pub struct StorageManager {
    selection: ProviderSelection,
    settings: StorageSettings,
}

impl StorageManager {
    /// Resolve settings and select the provider.
    pub async fn initialize(settings: &StorageSettings) -> Self {
        Self {
            selection: build_provider(settings).await,
            settings: settings.clone(),
        }
    }

    /// Wrap an already constructed provider.
    pub fn from_provider(
        provider: Arc<dyn StorageProvider>,
        is_internal: bool,
        settings: StorageSettings,
    ) -> Self {
        Self {
            selection: ProviderSelection {
                provider,
                is_internal,
                source: None,
                unavailable_reason: None,
            },
            settings,
        }
    }

    /// The selected provider.
    pub fn provider(&self) -> Arc<dyn StorageProvider> {
        Arc::clone(&self.selection.provider)
    }

    /// Kind of the selected provider.
    pub fn kind(&self) -> ProviderKind {
        self.selection.provider.kind()
    }

    /// Whether the store is internally provisioned.
    pub fn is_internal(&self) -> bool {
        self.selection.is_internal
    }

    /// Origin of the object-store settings.
    pub fn source(&self) -> Option<&ConfigSource> {
        self.selection.source.as_ref()
    }

    /// Default lifetime of presigned URLs, in seconds.
    pub fn presigned_expiration(&self) -> u64 {
        self.settings.presigned_url_expiration
    }

    /// Loaded settings.
    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    /// URL strategy for the selected provider. The filesystem provider
    /// cannot presign, so it is always proxied.
    pub fn url_strategy(&self) -> UrlStrategy {
        let reachable = match self.kind() {
            ProviderKind::Filesystem => Some(false),
            _ => self.settings.endpoint_publicly_reachable,
        };
        UrlStrategy::new(
            self.provider(),
            self.is_internal(),
            reachable,
            self.settings.public_url.clone(),
        )
    }

    /// Transfer helper matching the provider kind.
    pub fn transfer(&self) -> AppResult<Arc<dyn ObjectTransfer>> {
        Ok(match self.kind() {
            ProviderKind::ObjectStore => Arc::new(PresignedTransfer::new(self.provider())?),
            _ => Arc::new(DirectTransfer::new(self.provider())),
        })
    }

    /// Misconfigurations worth telling the operator about at startup.
    pub fn startup_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(reason) = &self.selection.unavailable_reason {
            warnings.push(format!(
                "Object storage is not configured; storage operations will fail: {reason}"
            ));
            return warnings;
        }
        let has_public_url = self
            .settings
            .public_url
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty());
        match (self.kind(), self.is_internal(), has_public_url) {
            (ProviderKind::ObjectStore, true, false) => warnings.push(
                "STORAGE_URL is not set; public download links cannot be generated with internal storage"
                    .to_string(),
            ),
            (ProviderKind::ObjectStore, false, true) => warnings.push(
                "STORAGE_URL is set but ignored because ENABLE_S3=true uses the S3 endpoint directly"
                    .to_string(),
            ),
            _ => {}
        }
        warnings
    }

    /// Emit [`Self::startup_warnings`] through `tracing`.
    pub fn log_startup_warnings(&self) {
        for message in self.startup_warnings() {
            warn!("{message}");
        }
    }

    /// Health of the selected provider; errors count as unhealthy.
    pub async fn health_check(&self) -> bool {
        self.selection.provider.health_check().await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryStorageProvider;
    use crate::strategy::Delivery;

    fn settings() -> StorageSettings {
        StorageSettings {
            credentials_path: "/nonexistent/.minio-credentials".to_string(),
            ..StorageSettings::default()
        }
    }

    #[tokio::test]
    async fn test_missing_credentials_select_unconfigured() {
        let manager = StorageManager::initialize(&settings()).await;
        assert_eq!(manager.kind(), ProviderKind::Unconfigured);
        assert!(!manager.is_internal());
        assert!(!manager.health_check().await);
        let warnings = manager.startup_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("S3_ACCESS_KEY"));
    }

    #[tokio::test]
    async fn test_external_store_is_selected() {
        let settings = StorageSettings {
            enable_s3: true,
            endpoint: "s3.example.com".to_string(),
            use_ssl: true,
            access_key: "AKIA".to_string(),
            secret_key: "secret".to_string(),
            region: "us-east-1".to_string(),
            bucket_name: "files".to_string(),
            public_url: Some("https://files.example.com".to_string()),
            ..settings()
        };
        let manager = StorageManager::initialize(&settings).await;
        assert_eq!(manager.kind(), ProviderKind::ObjectStore);
        assert!(!manager.is_internal());
        assert_eq!(manager.source(), Some(&ConfigSource::Environment));
        assert_eq!(manager.url_strategy().delivery(), Delivery::Direct);
        assert!(manager.startup_warnings()[0].contains("ignored"));
    }

    #[tokio::test]
    async fn test_filesystem_root_is_always_proxied() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StorageSettings {
            filesystem_root: Some(dir.path().join("files").display().to_string()),
            endpoint_publicly_reachable: Some(true),
            ..settings()
        };
        let manager = StorageManager::initialize(&settings).await;
        assert_eq!(manager.kind(), ProviderKind::Filesystem);
        assert_eq!(manager.url_strategy().delivery(), Delivery::Proxied);
        assert!(manager.startup_warnings().is_empty());
    }

    #[tokio::test]
    async fn test_from_provider_uses_direct_transfer() {
        let store = Arc::new(MemoryStorageProvider::new());
        store.insert("a", "bytes").await;
        let manager = StorageManager::from_provider(store, false, settings());
        let transfer = manager.transfer().unwrap();
        assert_eq!(transfer.fetch("a").await.unwrap(), "bytes");
        assert_eq!(manager.presigned_expiration(), 3600);
    }
}
