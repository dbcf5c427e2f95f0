//! Response DTOs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sharebox_storage::TransferUrl;

/// A URL the client uses for one transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferUrlResponse {
    /// Presigned or proxy URL.
    pub url: String,
    /// Object key.
    pub object_name: String,
    /// Lifetime in seconds. Proxy URLs do not expire.
    pub expires_in: u64,
    /// Whether the transfer goes through this server.
    pub proxied: bool,
}

impl TransferUrlResponse {
    /// Build from a strategy decision.
    pub fn new(transfer: TransferUrl, object_name: &str, expires_in: u64) -> Self {
        Self {
            proxied: transfer.is_proxied(),
            url: transfer.url,
            object_name: object_name.to_string(),
            expires_in,
        }
    }
}

/// Confirmation of an object removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteObjectResponse {
    /// Human-readable result.
    pub message: String,
    /// Object key.
    pub object_name: String,
}

/// Object existence check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistsResponse {
    /// Whether the object is stored.
    pub exists: bool,
    /// Object key.
    pub object_name: String,
}

/// Result of a proxied upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Object key.
    pub object_name: String,
    /// Bytes stored.
    pub size: u64,
}

/// Recursive folder size. Serialized as a string since it may exceed
/// what JSON numbers carry exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSizeResponse {
    /// Folder id.
    pub folder_id: Uuid,
    /// Total bytes in the subtree.
    pub total_size: String,
}

/// Simple message body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable result.
    pub message: String,
}

impl MessageResponse {
    /// Wrap a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Health check body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Active storage provider.
    pub storage: String,
    /// Whether the storage provider answered its health check.
    pub storage_healthy: bool,
    /// Whether transfers are proxied through this server.
    pub internal_storage: bool,
}
