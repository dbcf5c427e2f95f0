//! Delivery of reverse-share upload digests to share owners.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::AppResult;

/// One coalesced notice for a burst of uploads by a single uploader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDigest {
    /// Owner of the reverse share (the recipient).
    pub owner_id: Uuid,
    /// The reverse share that received the files.
    pub reverse_share_id: Uuid,
    /// Display name of the reverse share.
    pub share_name: String,
    /// Display name of the uploader.
    pub uploader_name: String,
    /// Uploader e-mail, if one was given.
    pub uploader_email: Option<String>,
    /// Names of every file in the burst, in upload order.
    pub file_names: Vec<String>,
}

impl UploadDigest {
    /// Number of files in the digest.
    pub fn file_count(&self) -> usize {
        self.file_names.len()
    }
}

/// Sends digests to share owners (e-mail, webhook, log...).
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug + 'static {
    /// Deliver a single digest.
    async fn send_upload_digest(&self, digest: &UploadDigest) -> AppResult<()>;
}
