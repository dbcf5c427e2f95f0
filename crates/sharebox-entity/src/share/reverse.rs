//! Reverse share: a public upload endpoint whose files are collected by
//! the owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A reverse share.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReverseShare {
    /// Unique identifier.
    pub id: Uuid,
    /// Optional display name.
    pub name: Option<String>,
    /// Public alias used in upload URLs.
    pub alias: Option<String>,
    /// Owner collecting the uploads.
    pub creator_id: Uuid,
    /// Whether uploads are accepted.
    pub is_active: bool,
    /// When the share stops accepting uploads.
    pub expiration: Option<DateTime<Utc>>,
    /// Argon2 hash of the upload password.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Maximum number of files.
    pub max_files: Option<i32>,
    /// Maximum size of a single file, in bytes.
    pub max_file_size: Option<i64>,
    /// Comma-separated list of accepted extensions.
    pub allowed_file_types: Option<String>,
    /// When the share was created.
    pub created_at: DateTime<Utc>,
}

impl ReverseShare {
    /// Name used in notifications.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Unnamed Reverse Share")
    }

    /// Whether the share has passed its expiration time.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|exp| exp < now)
    }

    /// Whether an upload password is set.
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Accepted extensions, lower-cased, without leading dots. Empty means
    /// any type is accepted.
    pub fn allowed_extensions(&self) -> Vec<String> {
        self.allowed_file_types
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|t| t.trim().trim_start_matches('.').to_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// A file uploaded into a reverse share.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReverseShareFile {
    /// Unique identifier.
    pub id: Uuid,
    /// The receiving reverse share.
    pub reverse_share_id: Uuid,
    /// Display name.
    pub name: String,
    /// Extension.
    pub extension: String,
    /// Size in bytes.
    pub size: i64,
    /// Object key.
    pub object_name: String,
    /// Uploader e-mail.
    pub uploader_email: Option<String>,
    /// Uploader display name.
    pub uploader_name: Option<String>,
    /// When the file was uploaded.
    pub created_at: DateTime<Utc>,
}

impl ReverseShareFile {
    /// Size as an unsigned byte count.
    pub fn size_bytes(&self) -> u64 {
        u64::try_from(self.size).unwrap_or(0)
    }
}

/// Data required to register an uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReverseShareFile {
    /// The receiving reverse share.
    pub reverse_share_id: Uuid,
    /// Display name.
    pub name: String,
    /// Extension.
    pub extension: String,
    /// Size in bytes.
    pub size: i64,
    /// Object key.
    pub object_name: String,
    /// Uploader e-mail.
    pub uploader_email: Option<String>,
    /// Uploader display name.
    pub uploader_name: Option<String>,
}
