//! Folder operations that enforce tree invariants.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::StorageProvider;
use sharebox_database::store::{FileStore, FolderStore};
use sharebox_entity::file::FileWithPath;
use sharebox_entity::folder::Folder;

use super::hierarchy::FolderHierarchy;

/// Outcome of a folder deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderDeletion {
    /// File records removed with the folder.
    pub deleted_files: usize,
    /// Objects whose removal failed; their records are gone regardless.
    pub failed_objects: Vec<String>,
}

/// Folder size, listing, move and delete.
#[derive(Debug, Clone)]
pub struct FolderService {
    folders: Arc<dyn FolderStore>,
    hierarchy: FolderHierarchy,
    storage: Arc<dyn StorageProvider>,
}

impl FolderService {
    /// Creates a new folder service.
    pub fn new(
        folders: Arc<dyn FolderStore>,
        files: Arc<dyn FileStore>,
        storage: Arc<dyn StorageProvider>,
    ) -> Self {
        Self {
            hierarchy: FolderHierarchy::new(Arc::clone(&folders), files),
            folders,
            storage,
        }
    }

    /// The underlying hierarchy walker.
    pub fn hierarchy(&self) -> &FolderHierarchy {
        &self.hierarchy
    }

    /// Gets a folder owned by `user_id`.
    pub async fn get_folder(&self, folder_id: Uuid, user_id: Uuid) -> AppResult<Folder> {
        self.folders
            .find_by_id(folder_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Folder not found"))
    }

    /// Recursive size of a folder.
    pub async fn folder_size(&self, folder_id: Uuid, user_id: Uuid) -> AppResult<u64> {
        self.get_folder(folder_id, user_id).await?;
        self.hierarchy
            .calculate_folder_size(folder_id, user_id)
            .await
    }

    /// Recursive file listing with paths relative to the folder.
    pub async fn list_files(&self, folder_id: Uuid, user_id: Uuid) -> AppResult<Vec<FileWithPath>> {
        self.get_folder(folder_id, user_id).await?;
        self.hierarchy
            .get_all_files_in_folder(folder_id, user_id, "")
            .await
    }

    /// Moves a folder under `new_parent_id`, or to the root when `None`.
    pub async fn move_folder(
        &self,
        folder_id: Uuid,
        new_parent_id: Option<Uuid>,
        user_id: Uuid,
    ) -> AppResult<Folder> {
        let folder = self.get_folder(folder_id, user_id).await?;

        if let Some(parent_id) = new_parent_id {
            if self.folders.find_by_id(parent_id, user_id).await?.is_none() {
                return Err(AppError::validation(
                    "Parent folder not found or access denied",
                ));
            }
            if parent_id == folder_id
                || self
                    .hierarchy
                    .is_descendant_of(parent_id, folder_id, user_id)
                    .await?
            {
                return Err(AppError::validation(
                    "Cannot move a folder into itself or its subfolders",
                ));
            }
        }

        if folder.parent_id == new_parent_id {
            return Ok(folder);
        }

        let moved = self.folders.update_parent(folder_id, new_parent_id).await?;
        info!(folder_id = %folder_id, parent_id = ?new_parent_id, "Moved folder");
        Ok(moved)
    }

    /// Deletes a folder with its subfolders, files and stored objects.
    /// Object removal failures are logged and do not stop the deletion.
    pub async fn delete_folder(&self, folder_id: Uuid, user_id: Uuid) -> AppResult<FolderDeletion> {
        self.get_folder(folder_id, user_id).await?;
        let files = self
            .hierarchy
            .get_all_files_in_folder(folder_id, user_id, "")
            .await?;

        let mut report = FolderDeletion {
            deleted_files: files.len(),
            failed_objects: Vec::new(),
        };
        for entry in &files {
            if let Err(e) = self.storage.delete_object(&entry.file.object_name).await {
                warn!(
                    object_name = %entry.file.object_name,
                    error = %e,
                    "Failed to delete object of folder file"
                );
                report.failed_objects.push(entry.file.object_name.clone());
            }
        }

        self.folders.delete(folder_id).await?;
        info!(
            folder_id = %folder_id,
            files = report.deleted_files,
            failed = report.failed_objects.len(),
            "Deleted folder"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharebox_core::error::ErrorKind;
    use sharebox_database::MemoryStore;
    use sharebox_storage::providers::MemoryStorageProvider;

    struct Fixture {
        store: Arc<MemoryStore>,
        objects: Arc<MemoryStorageProvider>,
        service: FolderService,
        user: Uuid,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryStorageProvider::new());
        let service = FolderService::new(store.clone(), store.clone(), objects.clone());
        Fixture {
            store,
            objects,
            service,
            user: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_move_into_descendant_is_rejected() {
        let f = fixture();
        let a = f.store.add_folder("a", None, f.user).await;
        let b = f.store.add_folder("b", Some(a.id), f.user).await;
        let c = f.store.add_folder("c", Some(b.id), f.user).await;

        let err = f
            .service
            .move_folder(a.id, Some(c.id), f.user)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(
            err.message,
            "Cannot move a folder into itself or its subfolders"
        );
        assert_eq!(f.store.folder(a.id).await.unwrap().parent_id, None);

        let err = f
            .service
            .move_folder(a.id, Some(a.id), f.user)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_move_to_foreign_parent_is_rejected() {
        let f = fixture();
        let a = f.store.add_folder("a", None, f.user).await;
        let foreign = f.store.add_folder("other", None, Uuid::new_v4()).await;

        let err = f
            .service
            .move_folder(a.id, Some(foreign.id), f.user)
            .await
            .unwrap_err();
        assert_eq!(err.message, "Parent folder not found or access denied");
    }

    #[tokio::test]
    async fn test_move_sibling_and_back_to_root() {
        let f = fixture();
        let a = f.store.add_folder("a", None, f.user).await;
        let b = f.store.add_folder("b", None, f.user).await;

        let moved = f.service.move_folder(b.id, Some(a.id), f.user).await.unwrap();
        assert_eq!(moved.parent_id, Some(a.id));

        let moved = f.service.move_folder(b.id, None, f.user).await.unwrap();
        assert_eq!(moved.parent_id, None);
    }

    #[tokio::test]
    async fn test_delete_removes_objects_then_records() {
        let f = fixture();
        let a = f.store.add_folder("a", None, f.user).await;
        let b = f.store.add_folder("b", Some(a.id), f.user).await;
        f.store.add_file("one.txt", 3, "u/one", Some(a.id), f.user).await;
        f.store.add_file("two.txt", 3, "u/two", Some(b.id), f.user).await;
        f.objects.insert("u/one", "one").await;
        f.objects.insert("u/two", "two").await;
        f.objects.fail_on("u/two").await;

        let report = f.service.delete_folder(a.id, f.user).await.unwrap();
        assert_eq!(report.deleted_files, 2);
        assert_eq!(report.failed_objects, vec!["u/two".to_string()]);
        assert!(f.objects.get("u/one").await.is_none());
        assert!(f.store.folder(a.id).await.is_none());
        assert!(f.store.folder(b.id).await.is_none());
        assert_eq!(f.store.file_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_folder_is_not_found() {
        let f = fixture();
        let err = f
            .service
            .folder_size(Uuid::new_v4(), f.user)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
