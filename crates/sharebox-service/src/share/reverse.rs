//! Reverse shares: public upload endpoints whose files land with the owner.

use std::collections::HashSet;
use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordVerifier};
use argon2::Argon2;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use sharebox_core::config::limits::LimitsConfig;
use sharebox_core::error::{AppError, ErrorKind};
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::{CompletedPart, StorageProvider};
use sharebox_database::store::{FileStore, ReverseShareStore};
use sharebox_entity::file::{CreateFile, File};
use sharebox_entity::share::{CreateReverseShareFile, ReverseShare, ReverseShareFile};
use sharebox_storage::transfer::{ObjectTransfer, RetryPolicy, retry_with_backoff};

use super::session::{UploadEvent, UploadSessionAggregator};
use crate::archive::ArchiveEntry;

const MAX_PART_NUMBER: i32 = 10_000;

/// A file the uploader has finished sending.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUpload {
    /// File name.
    pub name: String,
    /// Extension without the leading dot.
    #[serde(default)]
    pub extension: String,
    /// Size in bytes.
    pub size: u64,
    /// Object key returned by the multipart creation.
    pub object_name: String,
    /// Uploader e-mail.
    #[serde(default)]
    pub uploader_email: Option<String>,
    /// Uploader name.
    #[serde(default)]
    pub uploader_name: Option<String>,
}

/// Handle of a started multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartUpload {
    /// Store-issued upload id.
    pub upload_id: String,
    /// Object key the parts are assembled into.
    pub object_name: String,
}

/// Presigned PUT for a single-request upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    /// URL the uploader sends the bytes to.
    pub url: String,
    /// Object key the URL is signed for.
    pub object_name: String,
    /// Lifetime of the URL in seconds.
    pub expires_in: u64,
}

/// Public reverse-share upload flow and the owner-side copy.
#[derive(Debug, Clone)]
pub struct ReverseShareService {
    shares: Arc<dyn ReverseShareStore>,
    files: Arc<dyn FileStore>,
    storage: Arc<dyn StorageProvider>,
    transfer: Arc<dyn ObjectTransfer>,
    sessions: UploadSessionAggregator,
    limits: LimitsConfig,
    retry: RetryPolicy,
    url_expiry: u64,
}

impl ReverseShareService {
    /// Creates a new reverse share service.
    pub fn new(
        shares: Arc<dyn ReverseShareStore>,
        files: Arc<dyn FileStore>,
        storage: Arc<dyn StorageProvider>,
        transfer: Arc<dyn ObjectTransfer>,
        sessions: UploadSessionAggregator,
        limits: LimitsConfig,
        url_expiry: u64,
    ) -> Self {
        Self {
            shares,
            files,
            storage,
            transfer,
            sessions,
            limits,
            retry: RetryPolicy::default(),
            url_expiry,
        }
    }

    /// Replace the copy retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The upload session aggregator.
    pub fn sessions(&self) -> &UploadSessionAggregator {
        &self.sessions
    }

    /// Look up a share by alias and check that it accepts uploads.
    pub async fn authorize(&self, alias: &str, password: Option<&str>) -> AppResult<ReverseShare> {
        let share = self
            .shares
            .find_by_alias(alias)
            .await?
            .ok_or_else(|| AppError::not_found("Reverse share not found"))?;

        if !share.is_active {
            return Err(AppError::validation("Reverse share is inactive"));
        }
        if share.is_expired_at(Utc::now()) {
            return Err(AppError::validation("Reverse share has expired"));
        }
        if let Some(hash) = share.password_hash.as_deref() {
            let password = password
                .filter(|p| !p.is_empty())
                .ok_or_else(|| AppError::authorization("Password required"))?;
            if !verify_password(password, hash)? {
                return Err(AppError::authorization("Invalid password"));
            }
        }
        Ok(share)
    }

    /// Start a multipart upload into the share.
    pub async fn create_multipart(
        &self,
        alias: &str,
        filename: &str,
        extension: &str,
        password: Option<&str>,
    ) -> AppResult<MultipartUpload> {
        self.authorize(alias, password).await?;
        let object_name = multipart_object_name(alias, filename, extension);
        let upload_id = self.storage.create_multipart_upload(&object_name).await?;
        info!(alias, object_name = %object_name, "Started reverse share multipart upload");
        Ok(MultipartUpload {
            upload_id,
            object_name,
        })
    }

    /// Presigned URL for one part.
    pub async fn part_url(
        &self,
        alias: &str,
        object_name: &str,
        upload_id: &str,
        part_number: i32,
        password: Option<&str>,
    ) -> AppResult<String> {
        self.authorize(alias, password).await?;
        check_object_scope(alias, object_name)?;
        if !(1..=MAX_PART_NUMBER).contains(&part_number) {
            return Err(AppError::validation(format!(
                "Part number must be between 1 and {MAX_PART_NUMBER}"
            )));
        }
        self.storage
            .presigned_part_url(object_name, upload_id, part_number, self.url_expiry)
            .await
    }

    /// Assemble the uploaded parts.
    pub async fn complete_multipart(
        &self,
        alias: &str,
        object_name: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
        password: Option<&str>,
    ) -> AppResult<()> {
        self.authorize(alias, password).await?;
        check_object_scope(alias, object_name)?;
        if parts.is_empty() {
            return Err(AppError::validation("At least one part is required"));
        }
        self.storage
            .complete_multipart_upload(object_name, upload_id, parts)
            .await
    }

    /// Abandon a multipart upload.
    pub async fn abort_multipart(
        &self,
        alias: &str,
        object_name: &str,
        upload_id: &str,
        password: Option<&str>,
    ) -> AppResult<()> {
        self.authorize(alias, password).await?;
        check_object_scope(alias, object_name)?;
        self.storage
            .abort_multipart_upload(object_name, upload_id)
            .await
    }

    /// Presigned PUT for uploading `object_name` in one request. The key
    /// must live under the share's prefix.
    pub async fn presigned_upload_url(
        &self,
        alias: &str,
        object_name: &str,
        password: Option<&str>,
    ) -> AppResult<PresignedUpload> {
        self.authorize(alias, password).await?;
        check_object_scope(alias, object_name)?;
        let url = self
            .storage
            .presigned_put_url(object_name, self.url_expiry)
            .await?;
        Ok(PresignedUpload {
            url,
            object_name: object_name.to_string(),
            expires_in: self.url_expiry,
        })
    }

    /// Archive entries for received files the requester owns. Repeated
    /// names get a ` (n)` suffix so every entry keeps its own path.
    pub async fn archive_entries(
        &self,
        file_ids: &[Uuid],
        owner_id: Uuid,
    ) -> AppResult<Vec<ArchiveEntry>> {
        if file_ids.is_empty() {
            return Err(AppError::validation("No files to download"));
        }

        let files = self.shares.find_files_for_owner(file_ids, owner_id).await?;
        if files.is_empty() {
            return Err(AppError::not_found("No files found or unauthorized"));
        }

        let mut taken = HashSet::new();
        Ok(files
            .into_iter()
            .map(|file| ArchiveEntry {
                path: unique_path(&mut taken, &file.name),
                size: file.size_bytes(),
                object_name: file.object_name,
            })
            .collect())
    }

    /// Record a finished upload after checking the share's limits, then
    /// feed the upload session aggregator.
    pub async fn register_file_upload(
        &self,
        alias: &str,
        upload: RegisterUpload,
        password: Option<&str>,
    ) -> AppResult<ReverseShareFile> {
        let share = self.authorize(alias, password).await?;
        check_object_scope(alias, &upload.object_name)?;

        if let Some(max_files) = share.max_files.filter(|m| *m > 0) {
            let count = self.shares.count_files(share.id).await?;
            if count >= i64::from(max_files) {
                return Err(AppError::validation("Maximum number of files reached")
                    .with_details(json!({ "maxFiles": max_files, "currentFiles": count })));
            }
        }

        if let Some(max_size) = share.max_file_size.filter(|m| *m > 0) {
            if upload.size > u64::try_from(max_size).unwrap_or(0) {
                return Err(AppError::validation("File size exceeds limit")
                    .with_details(json!({ "maxFileSize": max_size, "fileSize": upload.size })));
            }
        }

        let allowed = share.allowed_extensions();
        let extension = upload.extension.trim_start_matches('.').to_lowercase();
        if !allowed.is_empty() && !allowed.contains(&extension) {
            return Err(AppError::validation("File type not allowed")
                .with_details(json!({ "allowedFileTypes": allowed })));
        }

        let size = i64::try_from(upload.size)
            .map_err(|_| AppError::validation("File size exceeds limit"))?;
        if !self.storage.file_exists(&upload.object_name).await? {
            return Err(AppError::validation("Uploaded object not found")
                .with_details(json!({ "objectName": upload.object_name })));
        }
        let file = self
            .shares
            .create_file(&CreateReverseShareFile {
                reverse_share_id: share.id,
                name: upload.name.clone(),
                extension: upload.extension,
                size,
                object_name: upload.object_name,
                uploader_email: upload.uploader_email.clone(),
                uploader_name: upload.uploader_name.clone(),
            })
            .await?;

        self.sessions
            .record_upload(UploadEvent {
                reverse_share_id: share.id,
                owner_id: share.creator_id,
                share_name: share.display_name().to_string(),
                file_name: upload.name,
                uploader_email: upload.uploader_email,
                uploader_name: upload.uploader_name,
            })
            .await;

        Ok(file)
    }

    /// Copy a received file into the owner's own files.
    pub async fn copy_to_user_files(&self, file_id: Uuid, requester_id: Uuid) -> AppResult<File> {
        let file = self
            .shares
            .find_file(file_id)
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))?;
        let share = self
            .shares
            .find_by_id(file.reverse_share_id)
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))?;
        if share.creator_id != requester_id {
            return Err(AppError::authorization("Unauthorized to copy this file"));
        }

        let size = file.size_bytes();
        if size > self.limits.max_file_size_bytes {
            return Err(AppError::validation(format!(
                "File size exceeds the maximum allowed size of {}MB",
                self.limits.max_file_size_bytes / (1024 * 1024)
            ))
            .with_details(json!({ "maxFileSize": self.limits.max_file_size_bytes })));
        }

        let used = self.files.total_size_for_user(requester_id).await?;
        let quota = self.limits.max_total_storage_per_user_bytes;
        if used.checked_add(size).is_none_or(|total| total > quota) {
            let available = quota.saturating_sub(used);
            return Err(AppError::validation(format!(
                "Insufficient storage space. You have {:.2}MB available",
                available as f64 / (1024.0 * 1024.0)
            ))
            .with_details(json!({ "availableBytes": available, "quotaBytes": quota })));
        }

        let target = format!(
            "{requester_id}/{}-{}",
            Utc::now().timestamp_millis(),
            sanitize_key_segment(&file.name)
        );
        let transfer = Arc::clone(&self.transfer);
        retry_with_backoff(&self.retry, "copy_reverse_share_file", || {
            let transfer = Arc::clone(&transfer);
            let source = file.object_name.clone();
            let target = target.clone();
            async move { transfer.copy(&source, &target).await }
        })
        .await
        .map_err(|e| match e.kind {
            ErrorKind::TransientIo => AppError::transient(format!(
                "Failed to copy file after {} attempts: {}",
                self.retry.max_attempts, e.message
            )),
            _ => e,
        })?;

        let created = self
            .files
            .create(&CreateFile {
                name: file.name.clone(),
                extension: file.extension.clone(),
                size: file.size,
                object_name: target.clone(),
                user_id: requester_id,
                folder_id: None,
            })
            .await;

        match created {
            Ok(record) => {
                info!(file_id = %file.id, object_name = %target, "Copied reverse share file to user files");
                Ok(record)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete_object(&target).await {
                    warn!(object_name = %target, error = %cleanup, "Failed to remove copied object");
                }
                Err(e)
            }
        }
    }
}

/// Check a password against an Argon2 PHC string.
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("Invalid password hash: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::internal(format!("Password verification failed: {e}"))),
    }
}

/// `reverse-shares/{alias}/{millis}-{token}-{filename}.{ext}`.
pub fn multipart_object_name(alias: &str, filename: &str, extension: &str) -> String {
    let mut name = format!(
        "reverse-shares/{alias}/{}-{}-{}",
        Utc::now().timestamp_millis(),
        random_token(),
        sanitize_key_segment(filename)
    );
    let extension = extension.trim_start_matches('.');
    if !extension.is_empty() {
        name.push('.');
        name.push_str(&sanitize_key_segment(extension));
    }
    name
}

fn check_object_scope(alias: &str, object_name: &str) -> AppResult<()> {
    let prefix = format!("reverse-shares/{alias}/");
    if object_name.starts_with(&prefix) && !object_name.contains("..") {
        Ok(())
    } else {
        Err(AppError::validation(
            "Object does not belong to this reverse share",
        ))
    }
}

fn unique_path(taken: &mut HashSet<String>, name: &str) -> String {
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
        _ => (name, String::new()),
    };
    let mut candidate = name.to_string();
    let mut n = 1;
    while !taken.insert(candidate.clone()) {
        n += 1;
        candidate = format!("{stem} ({n}){extension}");
    }
    candidate
}

fn sanitize_key_segment(value: &str) -> String {
    value.replace(['/', '\\'], "-")
}

fn random_token() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut n: u64 = rand::random();
    (0..6)
        .map(|_| {
            let c = ALPHABET[(n % 36) as usize] as char;
            n /= 36;
            c
        })
        .collect()
}
