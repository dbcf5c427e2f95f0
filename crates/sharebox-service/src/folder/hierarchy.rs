//! Recursive queries over a user's folder tree.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::warn;
use uuid::Uuid;

use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;
use sharebox_database::store::{FileStore, FolderStore};
use sharebox_entity::file::FileWithPath;

/// Walks folder trees through the record stores. Nothing is cached; every
/// call reflects the current records.
#[derive(Debug, Clone)]
pub struct FolderHierarchy {
    folders: Arc<dyn FolderStore>,
    files: Arc<dyn FileStore>,
}

impl FolderHierarchy {
    /// Creates a hierarchy walker.
    pub fn new(folders: Arc<dyn FolderStore>, files: Arc<dyn FileStore>) -> Self {
        Self { folders, files }
    }

    /// Total size of every file below `folder_id`, at any depth.
    pub async fn calculate_folder_size(&self, folder_id: Uuid, user_id: Uuid) -> AppResult<u64> {
        let mut total: u64 = 0;
        let mut visited = HashSet::new();
        let mut pending = vec![folder_id];

        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                warn!(folder_id = %current, "Folder cycle detected while computing size");
                continue;
            }

            for file in self.files.list_in_folder(current, user_id).await? {
                total = total.checked_add(file.size_bytes()).ok_or_else(|| {
                    AppError::internal(format!("Folder size overflow in folder {folder_id}"))
                })?;
            }

            pending.extend(
                self.folders
                    .list_children(current, user_id)
                    .await?
                    .into_iter()
                    .map(|child| child.id),
            );
        }

        Ok(total)
    }

    /// Every file below `folder_id` with its path relative to the walk root,
    /// prefixed by `base_path`. A folder's own files come before its
    /// subfolders; subfolders are visited in name order.
    pub async fn get_all_files_in_folder(
        &self,
        folder_id: Uuid,
        user_id: Uuid,
        base_path: &str,
    ) -> AppResult<Vec<FileWithPath>> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.collect(folder_id, user_id, base_path.to_string(), &mut visited, &mut out)
            .await?;
        Ok(out)
    }

    fn collect<'a>(
        &'a self,
        folder_id: Uuid,
        user_id: Uuid,
        base_path: String,
        visited: &'a mut HashSet<Uuid>,
        out: &'a mut Vec<FileWithPath>,
    ) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            if !visited.insert(folder_id) {
                warn!(folder_id = %folder_id, "Folder cycle detected while listing files");
                return Ok(());
            }

            for file in self.files.list_in_folder(folder_id, user_id).await? {
                let relative_path = format!("{base_path}{}", file.display_name());
                out.push(FileWithPath {
                    file,
                    relative_path,
                });
            }

            for child in self.folders.list_children(folder_id, user_id).await? {
                let child_path = format!("{base_path}{}/", child.name);
                self.collect(child.id, user_id, child_path, visited, out)
                    .await?;
            }
            Ok(())
        })
    }

    /// Whether `candidate` lies strictly below `ancestor`. Walks parent
    /// links upward; roots and dangling references end the walk.
    pub async fn is_descendant_of(
        &self,
        candidate: Uuid,
        ancestor: Uuid,
        user_id: Uuid,
    ) -> AppResult<bool> {
        let mut visited = HashSet::new();
        let mut current = self
            .folders
            .find_by_id(candidate, user_id)
            .await?
            .and_then(|f| f.parent_id);

        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            if !visited.insert(id) {
                return Ok(false);
            }
            current = self
                .folders
                .find_by_id(id, user_id)
                .await?
                .and_then(|f| f.parent_id);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharebox_database::MemoryStore;

    fn hierarchy(store: &Arc<MemoryStore>) -> FolderHierarchy {
        FolderHierarchy::new(store.clone(), store.clone())
    }

    #[tokio::test]
    async fn test_size_sums_nested_files_beyond_32_bits() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let root = store.add_folder("root", None, user).await;
        let child = store.add_folder("child", Some(root.id), user).await;
        let grandchild = store.add_folder("grandchild", Some(child.id), user).await;

        let big = (1i64 << 31) + 5;
        store.add_file("a.bin", big, "u/a", Some(root.id), user).await;
        store.add_file("b.bin", 10, "u/b", Some(child.id), user).await;
        store.add_file("c.bin", big, "u/c", Some(grandchild.id), user).await;
        // Somebody else's file never counts.
        store
            .add_file("x.bin", 999, "o/x", Some(root.id), Uuid::new_v4())
            .await;

        let size = hierarchy(&store)
            .calculate_folder_size(root.id, user)
            .await
            .unwrap();
        assert_eq!(size, 2 * ((1u64 << 31) + 5) + 10);
    }

    #[tokio::test]
    async fn test_empty_folder_has_zero_size() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let root = store.add_folder("root", None, user).await;
        assert_eq!(
            hierarchy(&store)
                .calculate_folder_size(root.id, user)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_files_listed_before_subfolders_in_name_order() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let root = store.add_folder("Docs", None, user).await;
        let zeta = store.add_folder("zeta", Some(root.id), user).await;
        let alpha = store.add_folder("alpha", Some(root.id), user).await;
        store.add_file("z.txt", 1, "u/z", Some(zeta.id), user).await;
        store.add_file("a.txt", 1, "u/a", Some(alpha.id), user).await;
        store.add_file("readme.md", 1, "u/r", Some(root.id), user).await;

        let paths: Vec<String> = hierarchy(&store)
            .get_all_files_in_folder(root.id, user, "Docs/")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.relative_path)
            .collect();
        assert_eq!(
            paths,
            vec!["Docs/readme.md", "Docs/alpha/a.txt", "Docs/zeta/z.txt"]
        );
    }

    #[tokio::test]
    async fn test_descendant_check() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let a = store.add_folder("a", None, user).await;
        let b = store.add_folder("b", Some(a.id), user).await;
        let c = store.add_folder("c", Some(b.id), user).await;
        let h = hierarchy(&store);

        assert!(h.is_descendant_of(c.id, a.id, user).await.unwrap());
        assert!(h.is_descendant_of(b.id, a.id, user).await.unwrap());
        assert!(!h.is_descendant_of(a.id, c.id, user).await.unwrap());
        assert!(!h.is_descendant_of(a.id, a.id, user).await.unwrap());
        assert!(!h.is_descendant_of(Uuid::new_v4(), a.id, user).await.unwrap());
    }
}
