//! In-memory record store.
//!
//! Implements every store trait over process-local maps. Used by the test
//! suites of the service, worker and API crates.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;
use sharebox_entity::file::{CreateFile, File};
use sharebox_entity::folder::{CreateFolder, Folder};
use sharebox_entity::share::{CreateReverseShareFile, ReverseShare, ReverseShareFile};

use crate::store::{FileStore, FolderStore, ReverseShareStore};

#[derive(Debug, Default)]
struct Tables {
    folders: HashMap<Uuid, Folder>,
    files: HashMap<Uuid, File>,
    reverse_shares: HashMap<Uuid, ReverseShare>,
    reverse_share_files: HashMap<Uuid, ReverseShareFile>,
}

/// Record store backed by hash maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a folder and return it.
    pub async fn add_folder(&self, name: &str, parent_id: Option<Uuid>, user_id: Uuid) -> Folder {
        let now = Utc::now();
        let folder = Folder {
            id: Uuid::new_v4(),
            name: name.to_string(),
            parent_id,
            user_id,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .folders
            .insert(folder.id, folder.clone());
        folder
    }

    /// Insert a file and return it. `name` may carry an extension, which
    /// is split off into the extension column.
    pub async fn add_file(
        &self,
        name: &str,
        size: i64,
        object_name: &str,
        folder_id: Option<Uuid>,
        user_id: Uuid,
    ) -> File {
        let (stem, extension) = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), ext.to_string()),
            _ => (name.to_string(), String::new()),
        };
        let now = Utc::now();
        let file = File {
            id: Uuid::new_v4(),
            name: stem,
            extension,
            size,
            object_name: object_name.to_string(),
            user_id,
            folder_id,
            expiration: None,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.files.insert(file.id, file.clone());
        file
    }

    /// Set or clear the expiration of a file.
    pub async fn set_expiration(&self, file_id: Uuid, expiration: Option<DateTime<Utc>>) {
        if let Some(file) = self.tables.write().await.files.get_mut(&file_id) {
            file.expiration = expiration;
        }
    }

    /// Insert a reverse share as-is.
    pub async fn add_reverse_share(&self, share: ReverseShare) {
        self.tables
            .write()
            .await
            .reverse_shares
            .insert(share.id, share);
    }

    /// Raw lookup of a folder, ignoring ownership.
    pub async fn folder(&self, id: Uuid) -> Option<Folder> {
        self.tables.read().await.folders.get(&id).cloned()
    }

    /// Number of file records.
    pub async fn file_count(&self) -> usize {
        self.tables.read().await.files.len()
    }
}

fn sort_by_name<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> (&str, Uuid),
{
    items.sort_by(|a, b| key(a).cmp(&key(b)));
}

#[async_trait]
impl FolderStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<Folder>> {
        let tables = self.tables.read().await;
        Ok(tables
            .folders
            .get(&id)
            .filter(|f| f.user_id == user_id)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid], user_id: Uuid) -> AppResult<Vec<Folder>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Folder> = ids
            .iter()
            .filter_map(|id| tables.folders.get(id))
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        sort_by_name(&mut found, |f| (f.name.as_str(), f.id));
        found.dedup_by_key(|f| f.id);
        Ok(found)
    }

    async fn list_children(&self, parent_id: Uuid, user_id: Uuid) -> AppResult<Vec<Folder>> {
        let tables = self.tables.read().await;
        let mut children: Vec<Folder> = tables
            .folders
            .values()
            .filter(|f| f.parent_id == Some(parent_id) && f.user_id == user_id)
            .cloned()
            .collect();
        sort_by_name(&mut children, |f| (f.name.as_str(), f.id));
        Ok(children)
    }

    async fn create(&self, data: &CreateFolder) -> AppResult<Folder> {
        Ok(self.add_folder(&data.name, data.parent_id, data.user_id).await)
    }

    async fn update_parent(&self, id: Uuid, parent_id: Option<Uuid>) -> AppResult<Folder> {
        let mut tables = self.tables.write().await;
        let folder = tables
            .folders
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
        folder.parent_id = parent_id;
        folder.updated_at = Utc::now();
        Ok(folder.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if tables.folders.remove(&current).is_none() {
                continue;
            }
            tables.files.retain(|_, f| f.folder_id != Some(current));
            pending.extend(
                tables
                    .folders
                    .values()
                    .filter(|f| f.parent_id == Some(current))
                    .map(|f| f.id),
            );
        }
        Ok(())
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<File>> {
        let tables = self.tables.read().await;
        Ok(tables
            .files
            .get(&id)
            .filter(|f| f.user_id == user_id)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid], user_id: Uuid) -> AppResult<Vec<File>> {
        let tables = self.tables.read().await;
        let mut found: Vec<File> = ids
            .iter()
            .filter_map(|id| tables.files.get(id))
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        sort_by_name(&mut found, |f| (f.name.as_str(), f.id));
        found.dedup_by_key(|f| f.id);
        Ok(found)
    }

    async fn list_in_folder(&self, folder_id: Uuid, user_id: Uuid) -> AppResult<Vec<File>> {
        let tables = self.tables.read().await;
        let mut files: Vec<File> = tables
            .files
            .values()
            .filter(|f| f.folder_id == Some(folder_id) && f.user_id == user_id)
            .cloned()
            .collect();
        sort_by_name(&mut files, |f| (f.name.as_str(), f.id));
        Ok(files)
    }

    async fn list_all(&self) -> AppResult<Vec<File>> {
        let tables = self.tables.read().await;
        let mut files: Vec<File> = tables.files.values().cloned().collect();
        files.sort_by_key(|f| (f.created_at, f.id));
        Ok(files)
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<File>> {
        let tables = self.tables.read().await;
        let mut files: Vec<File> = tables
            .files
            .values()
            .filter(|f| f.is_expired_at(now))
            .cloned()
            .collect();
        files.sort_by_key(|f| (f.expiration, f.id));
        Ok(files)
    }

    async fn total_size_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .files
            .values()
            .filter(|f| f.user_id == user_id)
            .map(File::size_bytes)
            .sum())
    }

    async fn create(&self, data: &CreateFile) -> AppResult<File> {
        let now = Utc::now();
        let file = File {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            extension: data.extension.clone(),
            size: data.size,
            object_name: data.object_name.clone(),
            user_id: data.user_id,
            folder_id: data.folder_id,
            expiration: None,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.files.insert(file.id, file.clone());
        Ok(file)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.tables.write().await.files.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ReverseShareStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ReverseShare>> {
        Ok(self.tables.read().await.reverse_shares.get(&id).cloned())
    }

    async fn find_by_alias(&self, alias: &str) -> AppResult<Option<ReverseShare>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reverse_shares
            .values()
            .find(|s| s.alias.as_deref() == Some(alias))
            .cloned())
    }

    async fn count_files(&self, reverse_share_id: Uuid) -> AppResult<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .reverse_share_files
            .values()
            .filter(|f| f.reverse_share_id == reverse_share_id)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn create_file(&self, data: &CreateReverseShareFile) -> AppResult<ReverseShareFile> {
        let file = ReverseShareFile {
            id: Uuid::new_v4(),
            reverse_share_id: data.reverse_share_id,
            name: data.name.clone(),
            extension: data.extension.clone(),
            size: data.size,
            object_name: data.object_name.clone(),
            uploader_email: data.uploader_email.clone(),
            uploader_name: data.uploader_name.clone(),
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .reverse_share_files
            .insert(file.id, file.clone());
        Ok(file)
    }

    async fn find_file(&self, id: Uuid) -> AppResult<Option<ReverseShareFile>> {
        Ok(self.tables.read().await.reverse_share_files.get(&id).cloned())
    }

    async fn find_files_for_owner(
        &self,
        ids: &[Uuid],
        owner_id: Uuid,
    ) -> AppResult<Vec<ReverseShareFile>> {
        let tables = self.tables.read().await;
        let mut found: Vec<ReverseShareFile> = ids
            .iter()
            .filter_map(|id| tables.reverse_share_files.get(id))
            .filter(|f| {
                tables
                    .reverse_shares
                    .get(&f.reverse_share_id)
                    .is_some_and(|s| s.creator_id == owner_id)
            })
            .cloned()
            .collect();
        sort_by_name(&mut found, |f| (f.name.as_str(), f.id));
        found.dedup_by_key(|f| f.id);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_children_are_scoped_and_ordered() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let root = store.add_folder("root", None, user).await;
        store.add_folder("zeta", Some(root.id), user).await;
        store.add_folder("alpha", Some(root.id), user).await;
        store.add_folder("intruder", Some(root.id), other).await;

        let children = FolderStore::list_children(&store, root.id, user)
            .await
            .unwrap();
        let names: Vec<_> = children.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_descendants() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let root = store.add_folder("root", None, user).await;
        let child = store.add_folder("child", Some(root.id), user).await;
        store.add_file("a.txt", 1, "k/a", Some(child.id), user).await;
        store.add_file("b.txt", 1, "k/b", None, user).await;

        FolderStore::delete(&store, root.id).await.unwrap();

        assert!(store.folder(child.id).await.is_none());
        assert_eq!(store.file_count().await, 1);
    }

    #[tokio::test]
    async fn test_add_file_splits_extension() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let file = store.add_file("photo.jpeg", 10, "k", None, user).await;
        assert_eq!(file.name, "photo");
        assert_eq!(file.extension, "jpeg");

        let dotfile = store.add_file(".env", 10, "k2", None, user).await;
        assert_eq!(dotfile.name, ".env");
        assert_eq!(dotfile.extension, "");
    }

    fn reverse_share(owner: Uuid) -> ReverseShare {
        ReverseShare {
            id: Uuid::new_v4(),
            name: None,
            alias: None,
            creator_id: owner,
            is_active: true,
            expiration: None,
            password_hash: None,
            max_files: None,
            max_file_size: None,
            allowed_file_types: None,
            created_at: Utc::now(),
        }
    }

    async fn received(store: &MemoryStore, share: &ReverseShare, name: &str) -> ReverseShareFile {
        store
            .create_file(&CreateReverseShareFile {
                reverse_share_id: share.id,
                name: name.to_string(),
                extension: "txt".to_string(),
                size: 1,
                object_name: format!("reverse-shares/x/{name}"),
                uploader_email: None,
                uploader_name: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_reverse_share_files_are_scoped_to_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let mine = reverse_share(owner);
        let theirs = reverse_share(Uuid::new_v4());
        store.add_reverse_share(mine.clone()).await;
        store.add_reverse_share(theirs.clone()).await;
        let b = received(&store, &mine, "b.txt").await;
        let a = received(&store, &mine, "a.txt").await;
        let foreign = received(&store, &theirs, "c.txt").await;

        let found = store
            .find_files_for_owner(&[b.id, foreign.id, a.id, b.id], owner)
            .await
            .unwrap();
        let names: Vec<_> = found.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }
}
