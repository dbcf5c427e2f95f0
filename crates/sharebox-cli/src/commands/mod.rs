//! CLI command definitions and dispatch.

pub mod cleanup;
pub mod migrate;
pub mod storage;

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use sharebox_core::config::AppConfig;
use sharebox_database::DatabasePool;

use crate::output::OutputFormat;

/// ShareBox maintenance tool
#[derive(Debug, Parser)]
#[command(name = "sharebox", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment, selecting `config/<env>.toml`
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Remove expired files or records without objects
    Cleanup(cleanup::CleanupArgs),
    /// Storage and schema migrations
    Migrate(migrate::MigrateArgs),
    /// Storage backend inspection
    Storage(storage::StorageArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> anyhow::Result<ExitCode> {
        let config = load_config(&self.env)?;
        sharebox_storage::tls::relax_tls_verification_once(
            config.storage.use_ssl,
            config.storage.reject_unauthorized,
        );
        match &self.command {
            Commands::Cleanup(args) => cleanup::execute(args, &config, self.format).await,
            Commands::Migrate(args) => migrate::execute(args, &config, self.format).await,
            Commands::Storage(args) => storage::execute(args, &config, self.format).await,
        }
    }
}

/// Helper: load configuration for an environment
pub fn load_config(env: &str) -> anyhow::Result<AppConfig> {
    AppConfig::load(env).context("Failed to load configuration")
}

/// Helper: connect to the database
pub async fn connect_database(config: &AppConfig) -> anyhow::Result<DatabasePool> {
    DatabasePool::connect(&config.database)
        .await
        .context("Failed to connect to the database")
}
