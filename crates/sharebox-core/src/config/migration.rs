//! Legacy filesystem migration and maintenance configuration.

use serde::{Deserialize, Serialize};

/// Settings for the filesystem to object-store migrator and the periodic
/// cleanup of expired files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Whether the automatic migration is scheduled at startup.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Root of the legacy upload tree.
    #[serde(default = "default_legacy_root")]
    pub legacy_upload_dir: String,
    /// File name of the persisted state, relative to the legacy root.
    #[serde(default = "default_state_file")]
    pub state_file_name: String,
    /// Number of files uploaded concurrently per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between batches in milliseconds.
    #[serde(default = "default_batch_delay")]
    pub batch_delay_ms: u64,
    /// Delay after startup before the migration begins, in seconds.
    #[serde(default = "default_start_delay")]
    pub start_delay_secs: u64,
    /// Whether expired files are purged on a schedule.
    #[serde(default = "default_true")]
    pub cleanup_enabled: bool,
    /// Cron expression (with seconds) for the expired-file purge.
    #[serde(default = "default_cleanup_cron")]
    pub cleanup_cron: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            legacy_upload_dir: default_legacy_root(),
            state_file_name: default_state_file(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay(),
            start_delay_secs: default_start_delay(),
            cleanup_enabled: default_true(),
            cleanup_cron: default_cleanup_cron(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_legacy_root() -> String {
    "./uploads".to_string()
}

fn default_state_file() -> String {
    ".migration-state.json".to_string()
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_delay() -> u64 {
    100
}

fn default_start_delay() -> u64 {
    5
}

fn default_cleanup_cron() -> String {
    "0 0 * * * *".to_string()
}
