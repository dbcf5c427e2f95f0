//! Storage backend inspection.

use std::process::ExitCode;

use clap::{Args, Subcommand};
use serde::Serialize;

use sharebox_core::config::AppConfig;
use sharebox_storage::StorageManager;
use sharebox_storage::resolver::ConfigSource;

use crate::output::{self, OutputFormat};

/// Arguments for storage commands
#[derive(Debug, Args)]
pub struct StorageArgs {
    /// Storage subcommand
    #[command(subcommand)]
    pub command: StorageCommand,
}

/// Storage subcommands
#[derive(Debug, Subcommand)]
pub enum StorageCommand {
    /// Show the selected provider, its settings and health
    Info,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StorageInfo {
    provider: String,
    internal: bool,
    config_source: Option<String>,
    endpoint: String,
    bucket: String,
    public_url: Option<String>,
    presigned_url_expiration: u64,
    healthy: bool,
    warnings: Vec<String>,
}

/// Execute storage commands
pub async fn execute(
    args: &StorageArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    match &args.command {
        StorageCommand::Info => {
            let storage = StorageManager::initialize(&config.storage).await;
            let settings = storage.settings();

            let info = StorageInfo {
                provider: storage.kind().to_string(),
                internal: storage.is_internal(),
                config_source: storage.source().map(|source| match source {
                    ConfigSource::CredentialsFile(path) => path.display().to_string(),
                    ConfigSource::Environment => "environment".to_string(),
                }),
                endpoint: settings.endpoint.clone(),
                bucket: settings.bucket_name.clone(),
                public_url: settings.public_url.clone(),
                presigned_url_expiration: storage.presigned_expiration(),
                healthy: storage.health_check().await,
                warnings: storage.startup_warnings(),
            };

            if format == OutputFormat::Json {
                output::print_json(&info);
            } else {
                output::print_kv("Provider", &info.provider);
                output::print_kv("Internal", if info.internal { "yes" } else { "no" });
                output::print_kv("Config source", info.config_source.as_deref().unwrap_or("-"));
                output::print_kv("Endpoint", &info.endpoint);
                output::print_kv("Bucket", &info.bucket);
                output::print_kv("Public URL", info.public_url.as_deref().unwrap_or("-"));
                output::print_kv(
                    "URL expiration",
                    &format!("{}s", info.presigned_url_expiration),
                );
                output::print_kv("Healthy", if info.healthy { "yes" } else { "no" });
                for warning in &info.warnings {
                    output::print_warning(warning);
                }
            }

            Ok(if info.healthy {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
