//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A file owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// Unique file identifier.
    pub id: Uuid,
    /// Display name (without the extension).
    pub name: String,
    /// Extension, without the leading dot.
    pub extension: String,
    /// Size in bytes. Files can exceed 4 GiB, so this is always 64-bit.
    pub size: i64,
    /// Key of the bytes in the object store.
    pub object_name: String,
    /// Owner.
    pub user_id: Uuid,
    /// Containing folder; `None` for root-level files.
    pub folder_id: Option<Uuid>,
    /// When the file is purged by the expired-file cleanup.
    pub expiration: Option<DateTime<Utc>>,
    /// When the file was created.
    pub created_at: DateTime<Utc>,
    /// When the file was last updated.
    pub updated_at: DateTime<Utc>,
}

impl File {
    /// Name as presented to users, with the extension re-attached.
    pub fn display_name(&self) -> String {
        if self.extension.is_empty() || self.name.ends_with(&format!(".{}", self.extension)) {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.extension)
        }
    }

    /// Size as an unsigned byte count. Negative values read as zero.
    pub fn size_bytes(&self) -> u64 {
        u64::try_from(self.size).unwrap_or(0)
    }

    /// Whether the file has passed its expiration time.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|exp| exp <= now)
    }
}

/// Data required to create a new file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFile {
    /// Display name.
    pub name: String,
    /// Extension.
    pub extension: String,
    /// Size in bytes.
    pub size: i64,
    /// Object key.
    pub object_name: String,
    /// Owner.
    pub user_id: Uuid,
    /// Containing folder.
    pub folder_id: Option<Uuid>,
}

/// A file annotated with its path relative to the folder being walked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileWithPath {
    /// The file record.
    #[serde(flatten)]
    pub file: File,
    /// Ancestor folder names and the file name, joined by `/`.
    pub relative_path: String,
}
