//! Expired-file and orphan-record cleanup.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::StorageProvider;
use sharebox_database::store::FileStore;
use sharebox_entity::file::File;

/// A file selected for cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupItem {
    /// File record id.
    pub file_id: Uuid,
    /// Display name.
    pub name: String,
    /// Object key.
    pub object_name: String,
    /// Size in bytes.
    pub size: u64,
    /// Expiration time, when the file expired.
    pub expiration: Option<DateTime<Utc>>,
}

impl From<&File> for CleanupItem {
    fn from(file: &File) -> Self {
        Self {
            file_id: file.id,
            name: file.display_name(),
            object_name: file.object_name.clone(),
            size: file.size_bytes(),
            expiration: file.expiration,
        }
    }
}

/// Result of a cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    /// Files matching the criteria.
    pub items: Vec<CleanupItem>,
    /// Files removed.
    pub deleted: usize,
    /// Files whose removal failed.
    pub failed: usize,
    /// Nothing was deleted because the pass was not confirmed.
    pub dry_run: bool,
}

impl CleanupReport {
    /// Number of matching files.
    pub fn found(&self) -> usize {
        self.items.len()
    }

    /// Sum of the sizes of the matching files.
    pub fn total_size(&self) -> u64 {
        self.items.iter().map(|i| i.size).sum()
    }
}

/// Removes expired files and records whose object is gone.
#[derive(Debug, Clone)]
pub struct CleanupJob {
    files: Arc<dyn FileStore>,
    storage: Arc<dyn StorageProvider>,
}

impl CleanupJob {
    /// Create a new cleanup job
    pub fn new(files: Arc<dyn FileStore>, storage: Arc<dyn StorageProvider>) -> Self {
        Self { files, storage }
    }

    /// Files expired at `now`: delete the object, then the record. Without
    /// `confirm`, only report them.
    pub async fn expired_files(&self, now: DateTime<Utc>, confirm: bool) -> AppResult<CleanupReport> {
        let expired = self.files.list_expired(now).await?;
        let mut report = CleanupReport {
            items: expired.iter().map(CleanupItem::from).collect(),
            dry_run: !confirm,
            ..CleanupReport::default()
        };
        if !confirm {
            return Ok(report);
        }

        for file in &expired {
            let removed = match self.storage.delete_object(&file.object_name).await {
                Ok(()) => true,
                Err(e) if e.is_not_found() => true,
                Err(e) => {
                    warn!(file_id = %file.id, object_name = %file.object_name, error = %e, "Failed to delete expired object");
                    false
                }
            };
            if removed {
                match self.files.delete(file.id).await {
                    Ok(()) => {
                        report.deleted += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!(file_id = %file.id, error = %e, "Failed to delete expired file record")
                    }
                }
            }
            report.failed += 1;
        }

        info!(
            found = report.found(),
            deleted = report.deleted,
            failed = report.failed,
            "Expired file cleanup finished"
        );
        Ok(report)
    }

    /// Records whose object no longer exists. Storage lookups that fail are
    /// treated as "exists" so nothing is removed on a flaky store.
    pub async fn orphan_records(&self, confirm: bool) -> AppResult<CleanupReport> {
        let mut orphans = Vec::new();
        for file in self.files.list_all().await? {
            match self.storage.file_exists(&file.object_name).await {
                Ok(false) => orphans.push(file),
                Ok(true) => {}
                Err(e) => {
                    warn!(file_id = %file.id, object_name = %file.object_name, error = %e, "Could not check object")
                }
            }
        }

        let mut report = CleanupReport {
            items: orphans.iter().map(CleanupItem::from).collect(),
            dry_run: !confirm,
            ..CleanupReport::default()
        };
        if !confirm {
            return Ok(report);
        }

        for file in &orphans {
            match self.files.delete(file.id).await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    warn!(file_id = %file.id, error = %e, "Failed to delete orphan record");
                    report.failed += 1;
                }
            }
        }

        info!(
            found = report.found(),
            deleted = report.deleted,
            failed = report.failed,
            "Orphan record cleanup finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sharebox_database::MemoryStore;
    use sharebox_storage::providers::MemoryStorageProvider;

    #[tokio::test]
    async fn test_expired_cleanup_respects_dry_run() {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryStorageProvider::new());
        let user = Uuid::new_v4();
        let old = store.add_file("old.txt", 5, "u/old", None, user).await;
        store.add_file("fresh.txt", 5, "u/fresh", None, user).await;
        store
            .set_expiration(old.id, Some(Utc::now() - Duration::days(1)))
            .await;
        objects.insert("u/old", "hello").await;

        let job = CleanupJob::new(store.clone(), objects.clone());
        let report = job.expired_files(Utc::now(), false).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.found(), 1);
        assert_eq!(report.total_size(), 5);
        assert_eq!(store.file_count().await, 2);

        let report = job.expired_files(Utc::now(), true).await.unwrap();
        assert_eq!(report.deleted, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(store.file_count().await, 1);
        assert!(objects.get("u/old").await.is_none());
    }

    #[tokio::test]
    async fn test_failed_object_delete_keeps_record() {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryStorageProvider::new());
        let old = store
            .add_file("old.txt", 1, "u/old", None, Uuid::new_v4())
            .await;
        store
            .set_expiration(old.id, Some(Utc::now() - Duration::hours(1)))
            .await;
        objects.fail_on("u/old").await;

        let report = CleanupJob::new(store.clone(), objects)
            .expired_files(Utc::now(), true)
            .await
            .unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(store.file_count().await, 1);
    }

    #[tokio::test]
    async fn test_orphans_are_records_without_objects() {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryStorageProvider::new());
        let user = Uuid::new_v4();
        store.add_file("kept.txt", 1, "u/kept", None, user).await;
        store.add_file("lost.txt", 1, "u/lost", None, user).await;
        objects.insert("u/kept", "k").await;

        let job = CleanupJob::new(store.clone(), objects);
        let report = job.orphan_records(true).await.unwrap();
        assert_eq!(report.found(), 1);
        assert_eq!(report.items[0].object_name, "u/lost");
        assert_eq!(report.deleted, 1);
        assert_eq!(store.file_count().await, 1);
    }
}
