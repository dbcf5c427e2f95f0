//! Legacy storage and database schema migration commands.

use std::process::ExitCode;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

use sharebox_core::config::AppConfig;
use sharebox_storage::StorageManager;
use sharebox_worker::jobs::{FilesystemMigrator, MigrationState};

use crate::output::{self, OutputFormat};

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Move the legacy upload directory into object storage
    Storage,
    /// Show the persisted storage migration state
    Status,
    /// Apply pending database schema migrations
    Schema,
}

/// Execute migration commands
pub async fn execute(
    args: &MigrateArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    match &args.command {
        MigrateCommand::Storage => {
            let storage = StorageManager::initialize(&config.storage).await;
            let mut migrator = FilesystemMigrator::new(storage.provider(), &config.migration);

            if !migrator
                .should_migrate()
                .await
                .context("Could not read migration state")?
            {
                output::print_success("Nothing to migrate.");
                return Ok(ExitCode::SUCCESS);
            }

            println!("Migrating {} ...", config.migration.legacy_upload_dir);
            let state = migrator.migrate().await.context("Migration failed")?;
            print_state(&state, format);

            if state.failed_files > 0 {
                output::print_warning(&format!(
                    "{} file(s) failed and remain in the legacy directory",
                    state.failed_files
                ));
                return Ok(ExitCode::FAILURE);
            }
            output::print_success("Storage migration complete.");
        }
        MigrateCommand::Status => {
            let storage = StorageManager::initialize(&config.storage).await;
            let migrator = FilesystemMigrator::new(storage.provider(), &config.migration);

            match migrator
                .load_state()
                .await
                .context("Could not read migration state")?
            {
                Some(state) => print_state(&state, format),
                None => output::print_warning(&format!(
                    "No migration state at {}",
                    migrator.state_path().display()
                )),
            }
        }
        MigrateCommand::Schema => {
            let db = super::connect_database(config).await?;
            println!("Running database migrations...");
            sharebox_database::migration::run_migrations(db.pool())
                .await
                .context("Migration failed")?;
            db.close().await;
            output::print_success("All migrations applied successfully.");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_state(state: &MigrationState, format: OutputFormat) {
    if format == OutputFormat::Json {
        output::print_json(state);
        return;
    }

    output::print_kv("Completed", if state.completed { "yes" } else { "no" });
    output::print_kv("Total files", &state.total_files.to_string());
    output::print_kv("Migrated", &state.migrated_files.to_string());
    output::print_kv("Skipped", &state.skipped_files.to_string());
    output::print_kv("Failed", &state.failed_files.to_string());
    output::print_kv("Uploaded", &output::format_bytes(state.total_size_bytes));
    output::print_kv("Started", &format_millis(state.start_time));
    if let Some(end) = state.end_time {
        output::print_kv("Finished", &format_millis(end));
    }
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}
