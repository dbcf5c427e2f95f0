//! Record-store traits consumed by the service layer.
//!
//! Every query that touches a user's tree is scoped by `user_id`; a record
//! owned by somebody else reads as absent. Listings are ordered by name and
//! then id so folder walks and archives are deterministic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use sharebox_core::result::AppResult;
use sharebox_entity::file::{CreateFile, File};
use sharebox_entity::folder::{CreateFolder, Folder};
use sharebox_entity::share::{CreateReverseShareFile, ReverseShare, ReverseShareFile};

/// Folder records.
#[async_trait]
pub trait FolderStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a folder owned by `user_id`.
    async fn find_by_id(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<Folder>>;

    /// Find several folders owned by `user_id`, in name order.
    async fn find_by_ids(&self, ids: &[Uuid], user_id: Uuid) -> AppResult<Vec<Folder>>;

    /// Direct children of a folder, in name order.
    async fn list_children(&self, parent_id: Uuid, user_id: Uuid) -> AppResult<Vec<Folder>>;

    /// Insert a folder.
    async fn create(&self, data: &CreateFolder) -> AppResult<Folder>;

    /// Re-parent a folder. Callers must have ruled out cycles.
    async fn update_parent(&self, id: Uuid, parent_id: Option<Uuid>) -> AppResult<Folder>;

    /// Delete a folder record together with its subfolders and file records.
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

/// File records.
#[async_trait]
pub trait FileStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a file owned by `user_id`.
    async fn find_by_id(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<File>>;

    /// Find several files owned by `user_id`, in name order.
    async fn find_by_ids(&self, ids: &[Uuid], user_id: Uuid) -> AppResult<Vec<File>>;

    /// Files directly inside a folder, in name order.
    async fn list_in_folder(&self, folder_id: Uuid, user_id: Uuid) -> AppResult<Vec<File>>;

    /// Every file record.
    async fn list_all(&self) -> AppResult<Vec<File>>;

    /// Files whose expiration is at or before `now`.
    async fn list_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<File>>;

    /// Sum of the sizes of every file owned by `user_id`.
    async fn total_size_for_user(&self, user_id: Uuid) -> AppResult<u64>;

    /// Insert a file.
    async fn create(&self, data: &CreateFile) -> AppResult<File>;

    /// Delete a file record.
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

/// Reverse shares and the files uploaded into them.
#[async_trait]
pub trait ReverseShareStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a reverse share by id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ReverseShare>>;

    /// Find a reverse share by its public alias.
    async fn find_by_alias(&self, alias: &str) -> AppResult<Option<ReverseShare>>;

    /// Number of files already uploaded into a share.
    async fn count_files(&self, reverse_share_id: Uuid) -> AppResult<i64>;

    /// Register an uploaded file.
    async fn create_file(&self, data: &CreateReverseShareFile) -> AppResult<ReverseShareFile>;

    /// Find an uploaded file by id.
    async fn find_file(&self, id: Uuid) -> AppResult<Option<ReverseShareFile>>;

    /// Uploaded files among `ids` whose share was created by `owner_id`,
    /// ordered by name.
    async fn find_files_for_owner(
        &self,
        ids: &[Uuid],
        owner_id: Uuid,
    ) -> AppResult<Vec<ReverseShareFile>>;
}
