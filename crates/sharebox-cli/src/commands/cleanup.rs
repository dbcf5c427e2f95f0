//! Expired-file and orphan-record cleanup commands.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use sharebox_core::config::AppConfig;
use sharebox_database::repositories::FileRepository;
use sharebox_storage::StorageManager;
use sharebox_worker::jobs::{CleanupItem, CleanupJob, CleanupReport};

use crate::output::{self, OutputFormat};

/// Arguments for cleanup commands
#[derive(Debug, Args)]
pub struct CleanupArgs {
    /// Cleanup subcommand
    #[command(subcommand)]
    pub command: CleanupCommand,
}

/// Cleanup subcommands
#[derive(Debug, Subcommand)]
pub enum CleanupCommand {
    /// Delete files whose expiration has passed
    Expired {
        /// Actually delete; without this flag only a report is printed
        #[arg(long)]
        confirm: bool,
    },
    /// Delete file records whose object no longer exists
    Orphans {
        /// Actually delete; without this flag only a report is printed
        #[arg(long)]
        confirm: bool,
    },
}

/// Cleanup display row
#[derive(Debug, Serialize, Tabled)]
struct CleanupRow {
    /// File ID
    id: String,
    /// Name
    name: String,
    /// Object key
    object: String,
    /// Size
    size: String,
    /// Expiration
    expired: String,
}

impl From<&CleanupItem> for CleanupRow {
    fn from(item: &CleanupItem) -> Self {
        Self {
            id: item.file_id.to_string(),
            name: item.name.clone(),
            object: item.object_name.clone(),
            size: output::format_bytes(item.size),
            expired: item
                .expiration
                .map(|e| e.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Execute cleanup commands
pub async fn execute(
    args: &CleanupArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let db = super::connect_database(config).await?;
    let storage = StorageManager::initialize(&config.storage).await;
    let job = CleanupJob::new(
        Arc::new(FileRepository::new(db.pool().clone())),
        storage.provider(),
    );

    let report = match &args.command {
        CleanupCommand::Expired { confirm } => job
            .expired_files(Utc::now(), *confirm)
            .await
            .context("Expired file cleanup failed")?,
        CleanupCommand::Orphans { confirm } => job
            .orphan_records(*confirm)
            .await
            .context("Orphan record cleanup failed")?,
    };
    db.close().await;

    Ok(print_report(&report, format))
}

fn print_report(report: &CleanupReport, format: OutputFormat) -> ExitCode {
    if format == OutputFormat::Json {
        output::print_json(report);
    } else {
        let rows: Vec<CleanupRow> = report.items.iter().map(CleanupRow::from).collect();
        output::print_list(&rows, format);
        output::print_kv("Found", &report.found().to_string());
        output::print_kv("Total size", &output::format_bytes(report.total_size()));

        if report.dry_run {
            if report.found() > 0 {
                output::print_warning("Dry run: nothing was deleted. Re-run with --confirm.");
            }
        } else {
            output::print_kv("Deleted", &report.deleted.to_string());
            output::print_kv("Failed", &report.failed.to_string());
        }
    }

    if report.failed > 0 {
        output::print_error(&format!("{} item(s) could not be deleted", report.failed));
        ExitCode::FAILURE
    } else {
        if !report.dry_run {
            output::print_success("Cleanup complete.");
        }
        ExitCode::SUCCESS
    }
}
