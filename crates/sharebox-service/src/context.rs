//! Wiring of the record stores, storage and services.

use std::sync::Arc;
use std::time::Duration;

use sharebox_core::config::AppConfig;
use sharebox_core::result::AppResult;
use sharebox_database::repositories::{FileRepository, FolderRepository, ReverseShareRepository};
use sharebox_database::{DatabasePool, FileStore, FolderStore, MemoryStore, ReverseShareStore};
use sharebox_storage::{StorageManager, UrlStrategy};

use crate::archive::BulkArchiveBuilder;
use crate::folder::FolderService;
use crate::notification::notifier_from_config;
use crate::share::{ReverseShareService, UploadSessionAggregator};

/// The record stores every service reads from.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Folder records.
    pub folders: Arc<dyn FolderStore>,
    /// File records.
    pub files: Arc<dyn FileStore>,
    /// Reverse shares and their files.
    pub reverse_shares: Arc<dyn ReverseShareStore>,
}

impl Stores {
    /// PostgreSQL-backed stores.
    pub fn postgres(db: &DatabasePool) -> Self {
        Self {
            folders: Arc::new(FolderRepository::new(db.pool().clone())),
            files: Arc::new(FileRepository::new(db.pool().clone())),
            reverse_shares: Arc::new(ReverseShareRepository::new(db.pool().clone())),
        }
    }

    /// All three stores backed by one in-memory store.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            folders: store.clone(),
            files: store.clone(),
            reverse_shares: store,
        }
    }
}

/// Everything a request handler needs.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    /// Selected storage provider and its settings.
    pub storage: StorageManager,
    /// Direct-vs-proxied URL decisions.
    pub urls: UrlStrategy,
    /// Record stores.
    pub stores: Stores,
    /// Folder operations.
    pub folders: FolderService,
    /// Bulk zip downloads.
    pub archives: BulkArchiveBuilder,
    /// Reverse-share uploads and copies.
    pub reverse_shares: ReverseShareService,
}

impl ServiceContext {
    /// Build the services for `config`.
    pub fn new(config: &AppConfig, storage: StorageManager, stores: Stores) -> AppResult<Self> {
        let provider = storage.provider();
        let transfer = storage.transfer()?;
        let sessions = UploadSessionAggregator::new(
            notifier_from_config(&config.notification)?,
            Duration::from_millis(config.notification.quiet_period_ms),
        );

        Ok(Self {
            urls: storage.url_strategy(),
            folders: FolderService::new(
                Arc::clone(&stores.folders),
                Arc::clone(&stores.files),
                Arc::clone(&provider),
            ),
            archives: BulkArchiveBuilder::new(
                Arc::clone(&stores.folders),
                Arc::clone(&stores.files),
                Arc::clone(&transfer),
            ),
            reverse_shares: ReverseShareService::new(
                Arc::clone(&stores.reverse_shares),
                Arc::clone(&stores.files),
                provider,
                transfer,
                sessions,
                config.limits.clone(),
                storage.presigned_expiration(),
            ),
            storage,
            stores,
        })
    }
}
