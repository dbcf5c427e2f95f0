//! Coalesces bursts of reverse-share uploads into one owner notification.
//!
//! Each `(reverse share, uploader)` pair has at most one pending delayed
//! task. A new upload aborts it, appends the file name and schedules a
//! fresh task; only the task of the latest generation may emit the digest.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use sharebox_core::traits::notifier::{Notifier, UploadDigest};

/// One upload reported to the aggregator.
#[derive(Debug, Clone)]
pub struct UploadEvent {
    /// Receiving reverse share.
    pub reverse_share_id: Uuid,
    /// Owner of the share.
    pub owner_id: Uuid,
    /// Share display name.
    pub share_name: String,
    /// Uploaded file name.
    pub file_name: String,
    /// Uploader e-mail, if given.
    pub uploader_email: Option<String>,
    /// Uploader name, if given.
    pub uploader_name: Option<String>,
}

impl UploadEvent {
    /// `"{share}-{email|name|anonymous}"`.
    pub fn session_key(&self) -> String {
        let present = |s: &&str| !s.trim().is_empty();
        let who = self
            .uploader_email
            .as_deref()
            .filter(present)
            .or(self.uploader_name.as_deref().filter(present))
            .unwrap_or("anonymous");
        format!("{}-{who}", self.reverse_share_id)
    }
}

#[derive(Debug)]
struct Session {
    owner_id: Uuid,
    reverse_share_id: Uuid,
    share_name: String,
    uploader_name: Option<String>,
    uploader_email: Option<String>,
    file_names: Vec<String>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl Session {
    fn digest(self) -> UploadDigest {
        UploadDigest {
            owner_id: self.owner_id,
            reverse_share_id: self.reverse_share_id,
            share_name: self.share_name,
            uploader_name: self
                .uploader_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Someone".to_string()),
            uploader_email: self.uploader_email,
            file_names: self.file_names,
        }
    }
}

type Sessions = Arc<Mutex<HashMap<String, Session>>>;

/// Keyed debounce state machine in front of a [`Notifier`].
#[derive(Debug, Clone)]
pub struct UploadSessionAggregator {
    sessions: Sessions,
    notifier: Arc<dyn Notifier>,
    quiet_period: Duration,
}

impl UploadSessionAggregator {
    /// Creates an aggregator that waits `quiet_period` after the last upload.
    pub fn new(notifier: Arc<dyn Notifier>, quiet_period: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            notifier,
            quiet_period,
        }
    }

    /// Record an upload and (re)arm the session's timer.
    pub async fn record_upload(&self, event: UploadEvent) {
        let key = event.session_key();
        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(key.clone()).or_insert_with(|| Session {
            owner_id: event.owner_id,
            reverse_share_id: event.reverse_share_id,
            share_name: event.share_name.clone(),
            uploader_name: event.uploader_name.clone(),
            uploader_email: event.uploader_email.clone(),
            file_names: Vec::new(),
            generation: 0,
            timer: None,
        });

        if let Some(timer) = session.timer.take() {
            timer.abort();
        }
        session.file_names.push(event.file_name);
        session.generation += 1;
        let generation = session.generation;
        debug!(session = %key, files = session.file_names.len(), "Upload recorded");

        let sessions_ref = Arc::clone(&self.sessions);
        let notifier = Arc::clone(&self.notifier);
        let quiet_period = self.quiet_period;
        session.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            flush(sessions_ref, notifier, key, generation).await;
        }));
    }

    /// Number of sessions still waiting for their quiet period.
    pub async fn pending_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Abort every pending timer without notifying.
    pub async fn shutdown(&self) {
        let mut sessions = self.sessions.lock().await;
        for (_, mut session) in sessions.drain() {
            if let Some(timer) = session.timer.take() {
                timer.abort();
            }
        }
    }
}

async fn flush(sessions: Sessions, notifier: Arc<dyn Notifier>, key: String, generation: u64) {
    let session = {
        let mut sessions = sessions.lock().await;
        match sessions.get(&key) {
            Some(s) if s.generation == generation => sessions.remove(&key),
            _ => None,
        }
    };
    let Some(session) = session else {
        return;
    };

    let digest = session.digest();
    match notifier.send_upload_digest(&digest).await {
        Ok(()) => info!(
            session = %key,
            files = digest.file_count(),
            "Sent reverse share upload notification"
        ),
        Err(e) => warn!(session = %key, error = %e, "Failed to send upload notification"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sharebox_core::result::AppResult;

    #[derive(Debug, Default)]
    struct Recorder {
        digests: Mutex<Vec<UploadDigest>>,
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn send_upload_digest(&self, digest: &UploadDigest) -> AppResult<()> {
            self.digests.lock().await.push(digest.clone());
            Ok(())
        }
    }

    fn event(share: Uuid, file: &str, email: Option<&str>) -> UploadEvent {
        UploadEvent {
            reverse_share_id: share,
            owner_id: Uuid::nil(),
            share_name: "Inbox".to_string(),
            file_name: file.to_string(),
            uploader_email: email.map(str::to_string),
            uploader_name: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_produces_one_digest() {
        let recorder = Arc::new(Recorder::default());
        let aggregator = UploadSessionAggregator::new(recorder.clone(), Duration::from_secs(5));
        let share = Uuid::new_v4();

        aggregator.record_upload(event(share, "f1", Some("u@x.io"))).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        aggregator.record_upload(event(share, "f2", Some("u@x.io"))).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        aggregator.record_upload(event(share, "f3", Some("u@x.io"))).await;

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert!(recorder.digests.lock().await.is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let digests = recorder.digests.lock().await.clone();
        assert_eq!(digests.len(), 1);
        assert_eq!(digests[0].file_names, vec!["f1", "f2", "f3"]);
        assert_eq!(digests[0].file_count(), 3);
        assert_eq!(digests[0].uploader_name, "Someone");
        assert_eq!(aggregator.pending_sessions().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uploaders_are_tracked_separately() {
        let recorder = Arc::new(Recorder::default());
        let aggregator = UploadSessionAggregator::new(recorder.clone(), Duration::from_secs(5));
        let share = Uuid::new_v4();

        aggregator.record_upload(event(share, "a", Some("one@x.io"))).await;
        aggregator.record_upload(event(share, "b", None)).await;
        assert_eq!(aggregator.pending_sessions().await, 2);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(recorder.digests.lock().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_digests() {
        let recorder = Arc::new(Recorder::default());
        let aggregator = UploadSessionAggregator::new(recorder.clone(), Duration::from_secs(5));
        aggregator
            .record_upload(event(Uuid::new_v4(), "a", None))
            .await;
        aggregator.shutdown().await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(recorder.digests.lock().await.is_empty());
    }

    #[test]
    fn test_session_key() {
        let share = Uuid::nil();
        assert_eq!(
            event(share, "f", Some("u@x.io")).session_key(),
            format!("{share}-u@x.io")
        );
        assert_eq!(event(share, "f", None).session_key(), format!("{share}-anonymous"));
    }
}
