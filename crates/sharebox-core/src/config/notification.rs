//! Reverse-share digest notification configuration.

use serde::{Deserialize, Serialize};

/// Controls how uploads into a reverse share are coalesced and delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Quiet period after the last upload before a digest is sent.
    #[serde(default = "default_quiet_period")]
    pub quiet_period_ms: u64,
    /// Optional webhook receiving digests as JSON. When unset, digests are
    /// only written to the log.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: default_quiet_period(),
            webhook_url: None,
        }
    }
}

fn default_quiet_period() -> u64 {
    5000
}
