//! Background work for ShareBox.
//!
//! This crate provides:
//! - The resumable legacy filesystem to object storage migrator
//! - Expired-file and orphan-record cleanup
//! - A cron scheduler running the cleanup periodically

pub mod jobs;
pub mod scheduler;

pub use jobs::{CleanupJob, FilesystemMigrator, MigrationState};
pub use scheduler::CronScheduler;
