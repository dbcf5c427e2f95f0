//! Digest delivery backends.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use sharebox_core::config::notification::NotificationConfig;
use sharebox_core::error::{AppError, ErrorKind};
use sharebox_core::result::AppResult;
use sharebox_core::traits::notifier::{Notifier, UploadDigest};
use sharebox_storage::tls;

/// Writes digests to the log. Used when no webhook is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_upload_digest(&self, digest: &UploadDigest) -> AppResult<()> {
        info!(
            owner_id = %digest.owner_id,
            reverse_share_id = %digest.reverse_share_id,
            share = %digest.share_name,
            uploader = %digest.uploader_name,
            files = digest.file_count(),
            "{} uploaded {} file(s) to {}",
            digest.uploader_name,
            digest.file_count(),
            digest.share_name
        );
        Ok(())
    }
}

/// POSTs each digest as JSON to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Creates a notifier for `url`.
    pub fn new(url: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            client: tls::http_client(Some(Duration::from_secs(30)))?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_upload_digest(&self, digest: &UploadDigest) -> AppResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(digest)
            .send()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::TransientIo, "Webhook request failed", e))?;

        if !response.status().is_success() {
            return Err(AppError::transient(format!(
                "Webhook responded with HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Pick the notifier for the configuration.
pub fn notifier_from_config(config: &NotificationConfig) -> AppResult<Arc<dyn Notifier>> {
    match config.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(url)?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}
