//! One-time move of the legacy upload tree into the object store.
//!
//! Files are uploaded under their path relative to the legacy root and
//! removed locally once stored. Progress is persisted after every batch so
//! an interrupted run resumes on the next start.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use sharebox_core::config::migration::MigrationConfig;
use sharebox_core::error::{AppError, ErrorKind};
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::{ProviderKind, StorageProvider};

/// Directory of proxied-upload spool files, never migrated.
const TEMP_UPLOADS_DIR: &str = "temp-uploads";

/// Persisted migration progress. Times are Unix milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationState {
    /// Files found by the scan.
    pub total_files: u64,
    /// Files uploaded and removed locally.
    pub migrated_files: u64,
    /// Files that could not be migrated.
    pub failed_files: u64,
    /// Files already present in the store, or no longer regular files.
    pub skipped_files: u64,
    /// Bytes uploaded.
    pub total_size_bytes: u64,
    /// When the current run started.
    pub start_time: i64,
    /// When the run finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    /// Whether the migration is done for good.
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    Migrated(u64),
    Skipped,
    Failed,
}

/// Migrates a legacy directory into a storage provider.
#[derive(Debug)]
pub struct FilesystemMigrator {
    provider: Arc<dyn StorageProvider>,
    root: PathBuf,
    state_path: PathBuf,
    batch_size: usize,
    batch_delay: Duration,
    state: MigrationState,
}

impl FilesystemMigrator {
    /// Creates a migrator for `config.legacy_upload_dir`.
    pub fn new(provider: Arc<dyn StorageProvider>, config: &MigrationConfig) -> Self {
        let root = PathBuf::from(&config.legacy_upload_dir);
        Self {
            provider,
            state_path: root.join(&config.state_file_name),
            root,
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            state: MigrationState {
                start_time: Utc::now().timestamp_millis(),
                ..MigrationState::default()
            },
        }
    }

    /// Current in-memory progress.
    pub fn state(&self) -> &MigrationState {
        &self.state
    }

    /// Location of the persisted state.
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Read the persisted state, if any.
    pub async fn load_state(&self) -> AppResult<Option<MigrationState>> {
        match fs::read_to_string(&self.state_path).await {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Decide whether a run is needed, preparing the state for it.
    pub async fn should_migrate(&mut self) -> AppResult<bool> {
        // The in-memory store stands in for an object store in tests.
        if !matches!(
            self.provider.kind(),
            ProviderKind::ObjectStore | ProviderKind::Memory
        ) {
            info!(provider = %self.provider.kind(), "Object storage not available, skipping migration");
            return Ok(false);
        }

        match self.load_state().await {
            Ok(Some(state)) if state.completed => {
                debug!("Filesystem migration already completed");
                self.state = state;
                return Ok(false);
            }
            Ok(Some(state)) => {
                info!(
                    migrated = state.migrated_files,
                    total = state.total_files,
                    "Previous migration incomplete, resuming"
                );
                self.state = MigrationState {
                    start_time: Utc::now().timestamp_millis(),
                    end_time: None,
                    ..state
                };
                return Ok(true);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not read migration state"),
        }

        let files = self.scan().await?;
        if files.is_empty() {
            info!("No legacy files found, nothing to migrate");
            self.state.end_time = Some(Utc::now().timestamp_millis());
            self.state.completed = true;
            self.save_state().await;
            return Ok(false);
        }

        info!(files = files.len(), "Legacy files found, migration needed");
        self.state.total_files = files.len() as u64;
        Ok(true)
    }

    /// Upload every legacy file in batches and mark the migration complete.
    pub async fn migrate(&mut self) -> AppResult<MigrationState> {
        info!(root = %self.root.display(), "Starting filesystem to object storage migration");

        let files = match self.scan().await {
            Ok(files) => files,
            Err(e) => {
                self.save_state().await;
                return Err(e);
            }
        };
        if self.state.total_files == 0 {
            self.state.total_files = files.len() as u64;
        }

        let total = files.len();
        for (index, batch) in files.chunks(self.batch_size).enumerate() {
            let outcomes = join_all(batch.iter().map(|rel| self.migrate_file(rel))).await;
            for outcome in outcomes {
                match outcome {
                    FileOutcome::Migrated(bytes) => {
                        self.state.migrated_files += 1;
                        self.state.total_size_bytes += bytes;
                    }
                    FileOutcome::Skipped => self.state.skipped_files += 1,
                    FileOutcome::Failed => self.state.failed_files += 1,
                }
            }
            self.save_state().await;

            let done = (index * self.batch_size + batch.len()).min(total);
            info!(
                progress_pct = done * 100 / total.max(1),
                migrated = self.state.migrated_files,
                total,
                "Migration progress"
            );

            if done < total {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        self.state.end_time = Some(Utc::now().timestamp_millis());
        self.state.completed = true;
        self.save_state().await;

        info!(
            total = self.state.total_files,
            migrated = self.state.migrated_files,
            failed = self.state.failed_files,
            skipped = self.state.skipped_files,
            size_mb = self.state.total_size_bytes / (1024 * 1024),
            duration_secs = (self.state.end_time.unwrap_or_default() - self.state.start_time) / 1000,
            "Filesystem migration completed"
        );
        Ok(self.state.clone())
    }

    /// Relative paths of every file below the root, `/`-separated and
    /// sorted. Dot entries and the temp-upload spool are skipped. A missing
    /// root holds no files.
    pub async fn scan(&self) -> AppResult<Vec<String>> {
        let mut files = Vec::new();
        let mut pending = vec![self.root.clone()];
        let mut is_root = true;

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if is_root && e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
                Err(e) if is_root => {
                    return Err(AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to scan legacy upload directory {}", dir.display()),
                        e,
                    ));
                }
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Could not scan directory");
                    continue;
                }
            };
            is_root = false;

            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.starts_with('.') || name == TEMP_UPLOADS_DIR {
                    continue;
                }
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    if let Ok(relative) = path.strip_prefix(&self.root) {
                        files.push(object_key(relative));
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }

    async fn migrate_file(&self, relative: &str) -> FileOutcome {
        let full_path = self.root.join(relative);
        let metadata = match fs::metadata(&full_path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                error!(file = relative, error = %e, "Failed to stat legacy file");
                return FileOutcome::Failed;
            }
        };
        if !metadata.is_file() {
            return FileOutcome::Skipped;
        }

        match self.provider.file_exists(relative).await {
            Ok(true) => {
                debug!(object_name = relative, "Already in object storage");
                return FileOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => {
                error!(object_name = relative, error = %e, "Failed to check object storage");
                return FileOutcome::Failed;
            }
        }

        if let Err(e) = self.provider.put_object_from_path(relative, &full_path).await {
            error!(object_name = relative, error = %e, "Failed to migrate file");
            return FileOutcome::Failed;
        }
        debug!(object_name = relative, kb = metadata.len() / 1024, "Migrated file");

        if let Err(e) = fs::remove_file(&full_path).await {
            warn!(file = relative, error = %e, "Could not delete migrated legacy file");
        }
        FileOutcome::Migrated(metadata.len())
    }

    async fn save_state(&self) {
        let result = match serde_json::to_vec_pretty(&self.state) {
            Ok(json) => fs::write(&self.state_path, json).await.map_err(AppError::from),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!(path = %self.state_path.display(), error = %e, "Could not save migration state");
        }
    }
}

fn object_key(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().replace('\\', "/"))
        .collect::<Vec<_>>()
        .join("/")
}

/// Check whether a migration is needed and, if so, run it on a detached
/// task after `delay`. Failures are logged; the next start retries.
pub async fn schedule_auto_migration(
    mut migrator: FilesystemMigrator,
    delay: Duration,
) -> Option<JoinHandle<()>> {
    match migrator.should_migrate().await {
        Ok(true) => {}
        Ok(false) => return None,
        Err(e) => {
            error!(error = %e, "Could not determine whether migration is needed");
            return None;
        }
    }

    info!(delay_secs = delay.as_secs(), "Background migration scheduled");
    Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = migrator.migrate().await {
            error!(error = %e, "Auto-migration failed, will retry on next server restart");
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharebox_storage::providers::{MemoryStorageProvider, UnconfiguredProvider};

    fn config(root: &Path) -> MigrationConfig {
        MigrationConfig {
            legacy_upload_dir: root.display().to_string(),
            batch_delay_ms: 0,
            ..MigrationConfig::default()
        }
    }

    async fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn test_existing_objects_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStorageProvider::new());
        for i in 0..25 {
            let key = format!("user{}/file{i:02}.txt", i % 3);
            write(dir.path(), &key, "payload").await;
            if i < 5 {
                store.insert(&key, "already there").await;
            }
        }

        let mut migrator = FilesystemMigrator::new(store.clone(), &config(dir.path()));
        assert!(migrator.should_migrate().await.unwrap());
        let state = migrator.migrate().await.unwrap();

        assert_eq!(store.put_count(), 20);
        assert_eq!(state.total_files, 25);
        assert_eq!(state.migrated_files, 20);
        assert_eq!(state.skipped_files, 5);
        assert_eq!(state.failed_files, 0);
        assert_eq!(state.total_size_bytes, 20 * 7);
        assert!(state.completed);

        // Skipped files stay on disk; migrated ones are gone.
        assert!(dir.path().join("user0/file00.txt").exists());
        assert!(!dir.path().join("user2/file05.txt").exists());
        assert_eq!(store.get("user0/file00.txt").await.unwrap(), "already there");
    }

    #[tokio::test]
    async fn test_second_run_uploads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStorageProvider::new());
        write(dir.path(), "a/one.bin", "1").await;
        write(dir.path(), "b/two.bin", "22").await;

        let mut first = FilesystemMigrator::new(store.clone(), &config(dir.path()));
        assert!(first.should_migrate().await.unwrap());
        first.migrate().await.unwrap();
        assert_eq!(store.put_count(), 2);

        let mut second = FilesystemMigrator::new(store.clone(), &config(dir.path()));
        assert!(!second.should_migrate().await.unwrap());
        assert_eq!(store.put_count(), 2);

        let persisted = second.load_state().await.unwrap().unwrap();
        assert!(persisted.completed);
        assert_eq!(persisted.migrated_files, 2);
    }

    #[tokio::test]
    async fn test_scan_skips_hidden_and_temp_entries() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "u/visible.txt", "x").await;
        write(dir.path(), "u/.hidden", "x").await;
        write(dir.path(), ".cache/file", "x").await;
        write(dir.path(), "temp-uploads/partial", "x").await;

        let migrator = FilesystemMigrator::new(
            Arc::new(MemoryStorageProvider::new()),
            &config(dir.path()),
        );
        assert_eq!(migrator.scan().await.unwrap(), vec!["u/visible.txt"]);
    }

    #[tokio::test]
    async fn test_empty_tree_is_marked_complete() {
        let dir = tempfile::tempdir().unwrap();
        let mut migrator = FilesystemMigrator::new(
            Arc::new(MemoryStorageProvider::new()),
            &config(dir.path()),
        );
        assert!(!migrator.should_migrate().await.unwrap());
        assert!(migrator.load_state().await.unwrap().unwrap().completed);
    }

    #[tokio::test]
    async fn test_failures_are_counted_and_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStorageProvider::new());
        write(dir.path(), "u/good.txt", "ok").await;
        write(dir.path(), "u/bad.txt", "no").await;
        store.fail_on("u/bad.txt").await;

        let mut migrator = FilesystemMigrator::new(store.clone(), &config(dir.path()));
        assert!(migrator.should_migrate().await.unwrap());
        let state = migrator.migrate().await.unwrap();
        assert_eq!(state.migrated_files, 1);
        assert_eq!(state.failed_files, 1);
        assert!(dir.path().join("u/bad.txt").exists());
    }

    #[tokio::test]
    async fn test_incomplete_state_resumes() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "u/rest.txt", "x").await;
        let previous = MigrationState {
            total_files: 3,
            migrated_files: 2,
            start_time: 1,
            ..MigrationState::default()
        };
        fs::write(
            dir.path().join(".migration-state.json"),
            serde_json::to_vec(&previous).unwrap(),
        )
        .await
        .unwrap();

        let store = Arc::new(MemoryStorageProvider::new());
        let mut migrator = FilesystemMigrator::new(store.clone(), &config(dir.path()));
        assert!(migrator.should_migrate().await.unwrap());
        assert!(migrator.state().start_time > 1);
        let state = migrator.migrate().await.unwrap();
        assert_eq!(state.migrated_files, 3);
        assert_eq!(state.total_files, 3);
    }

    #[tokio::test]
    async fn test_unavailable_store_never_migrates() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "u/a.txt", "x").await;
        let mut migrator = FilesystemMigrator::new(
            Arc::new(UnconfiguredProvider::new("no credentials")),
            &config(dir.path()),
        );
        assert!(!migrator.should_migrate().await.unwrap());
    }

    #[test]
    fn test_state_uses_camel_case_keys() {
        let json = serde_json::to_value(MigrationState {
            migrated_files: 4,
            completed: true,
            ..MigrationState::default()
        })
        .unwrap();
        assert_eq!(json["migratedFiles"], 4);
        assert_eq!(json["completed"], true);
        assert!(json.get("endTime").is_none());
    }
}
