//! Request DTOs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sharebox_core::error::AppError;
use sharebox_core::traits::storage::CompletedPart;
use sharebox_service::share::RegisterUpload;

/// Query parameters naming a stored object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectQuery {
    /// Object key.
    pub object_name: Option<String>,
    /// Lifetime of a presigned URL in seconds.
    pub expires_in: Option<u64>,
    /// Name offered to the browser on download.
    pub file_name: Option<String>,
}

impl ObjectQuery {
    /// The object key, rejecting a missing or blank one.
    pub fn require_object_name(&self) -> Result<&str, AppError> {
        self.object_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| AppError::validation("objectName is required"))
    }
}

/// Bulk zip download selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDownloadRequest {
    /// Files placed at the archive root.
    #[serde(default)]
    pub file_ids: Vec<Uuid>,
    /// Folders placed under their own name.
    #[serde(default)]
    pub folder_ids: Vec<Uuid>,
    /// Archive file name.
    #[serde(default)]
    pub zip_name: Option<String>,
}

/// Zip of received reverse-share files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseShareBulkDownloadRequest {
    /// Received files to include.
    #[serde(default)]
    pub file_ids: Vec<Uuid>,
    /// Archive file name.
    #[serde(default)]
    pub zip_name: Option<String>,
}

/// Folder move target. A missing or null parent moves to the root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveFolderRequest {
    /// New parent folder.
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// Start a multipart upload into a reverse share.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMultipartRequest {
    /// File name without extension.
    pub filename: String,
    /// Extension without the leading dot.
    #[serde(default)]
    pub extension: String,
    /// Share password.
    #[serde(default)]
    pub password: Option<String>,
}

/// Request a presigned URL for a single-request upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUploadRequest {
    /// Object key under the share's prefix.
    pub object_name: String,
    /// Share password.
    #[serde(default)]
    pub password: Option<String>,
}

/// Request a presigned URL for one part.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartUrlRequest {
    /// Object key from the creation call.
    pub object_name: String,
    /// Store-issued upload id.
    pub upload_id: String,
    /// 1-based part number.
    pub part_number: i32,
    /// Share password.
    #[serde(default)]
    pub password: Option<String>,
}

/// Assemble an uploaded multipart object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteMultipartRequest {
    /// Object key from the creation call.
    pub object_name: String,
    /// Store-issued upload id.
    pub upload_id: String,
    /// Uploaded parts.
    pub parts: Vec<CompletedPart>,
    /// Share password.
    #[serde(default)]
    pub password: Option<String>,
}

/// Abandon a multipart upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortMultipartRequest {
    /// Object key from the creation call.
    pub object_name: String,
    /// Store-issued upload id.
    pub upload_id: String,
    /// Share password.
    #[serde(default)]
    pub password: Option<String>,
}

/// Register a finished reverse-share upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterFileRequest {
    /// The uploaded file.
    #[serde(flatten)]
    pub upload: RegisterUpload,
    /// Share password.
    #[serde(default)]
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_object_name_is_rejected() {
        let query = ObjectQuery {
            object_name: Some("  ".to_string()),
            ..ObjectQuery::default()
        };
        let err = query.require_object_name().unwrap_err();
        assert_eq!(err.message, "objectName is required");
    }

    #[test]
    fn test_move_without_parent_targets_root() {
        let req: MoveFolderRequest = serde_json::from_str("{}").unwrap();
        assert!(req.parent_id.is_none());
        let req: MoveFolderRequest = serde_json::from_str(r#"{"parentId":null}"#).unwrap();
        assert!(req.parent_id.is_none());
    }

    #[test]
    fn test_register_request_flattens_upload() {
        let req: RegisterFileRequest = serde_json::from_str(
            r#"{"name":"a","extension":"txt","size":3,"objectName":"reverse-shares/x/1-a.txt","password":"pw"}"#,
        )
        .unwrap();
        assert_eq!(req.upload.size, 3);
        assert_eq!(req.password.as_deref(), Some("pw"));
    }
}
