//! ShareBox Server
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use sharebox_api::{AppState, serve, shutdown_signal};
use sharebox_core::config::AppConfig;
use sharebox_core::error::AppError;
use sharebox_database::DatabasePool;
use sharebox_database::migration::run_migrations;
use sharebox_service::{ServiceContext, Stores};
use sharebox_storage::manager::StorageManager;
use sharebox_storage::tls;
use sharebox_worker::jobs::schedule_auto_migration;
use sharebox_worker::{CleanupJob, CronScheduler, FilesystemMigrator};

#[tokio::main]
async fn main() {
    let env = std::env::var("SHAREBOX_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting ShareBox v{}", env!("CARGO_PKG_VERSION"));

    // Certificate policy must be fixed before any HTTP client is built.
    tls::relax_tls_verification_once(config.storage.use_ssl, config.storage.reject_unauthorized);

    tokio::fs::create_dir_all(&config.server.temp_dir)
        .await
        .map_err(|e| {
            AppError::internal(format!(
                "Failed to create dir '{}': {}",
                config.server.temp_dir, e
            ))
        })?;

    tracing::info!("Connecting to database...");
    let db = DatabasePool::connect(&config.database).await?;
    if config.database.run_migrations {
        tracing::info!("Running database migrations...");
        run_migrations(db.pool()).await?;
        tracing::info!("Database migrations complete");
    }

    tracing::info!("Initializing storage provider...");
    let storage = StorageManager::initialize(&config.storage).await;
    storage.log_startup_warnings();
    let provider = storage.provider();

    let stores = Stores::postgres(&db);
    let cleanup = Arc::new(CleanupJob::new(
        Arc::clone(&stores.files),
        Arc::clone(&provider),
    ));
    let services = ServiceContext::new(&config, storage, stores)?;

    let migration_handle = if config.migration.enabled {
        schedule_auto_migration(
            FilesystemMigrator::new(Arc::clone(&provider), &config.migration),
            Duration::from_secs(config.migration.start_delay_secs),
        )
        .await
    } else {
        None
    };

    let mut scheduler = if config.migration.cleanup_enabled {
        let scheduler = CronScheduler::new().await?;
        scheduler
            .register_expired_cleanup(cleanup, &config.migration.cleanup_cron)
            .await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        None
    };

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let state = AppState::new(config, services);
    serve(state, shutdown_signal()).await?;

    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!("{}", e);
        }
    }

    if let Some(handle) = migration_handle {
        if !handle.is_finished() {
            tracing::info!("Waiting for background migration to reach a stopping point...");
            if tokio::time::timeout(grace, handle).await.is_err() {
                tracing::warn!("Background migration still running, progress is kept in its state file");
            }
        }
    }

    db.close().await;
    tracing::info!("ShareBox server shut down gracefully");
    Ok(())
}
