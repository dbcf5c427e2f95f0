//! Built-in job implementations.

pub mod cleanup;
pub mod migration;

pub use cleanup::{CleanupItem, CleanupJob, CleanupReport};
pub use migration::{FilesystemMigrator, MigrationState, schedule_auto_migration};
