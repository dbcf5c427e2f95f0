//! Per-user storage limits.

use serde::{Deserialize, Serialize};

/// Limits applied when files are added to a user's space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Largest single file, in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Total size of every file a user may own, in bytes.
    #[serde(default = "default_max_total_storage")]
    pub max_total_storage_per_user_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size(),
            max_total_storage_per_user_bytes: default_max_total_storage(),
        }
    }
}

fn default_max_file_size() -> u64 {
    1 << 40
}

fn default_max_total_storage() -> u64 {
    10 << 40
}
