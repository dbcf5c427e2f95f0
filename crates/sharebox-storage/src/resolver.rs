//! Resolution of the one canonical object-store connection record.
//!
//! Internal deployments provision their own object store and drop a
//! `KEY=VALUE` credentials artifact next to the server. External
//! deployments configure everything through the environment. Exactly one
//! [`StorageConfig`] comes out of [`resolve`] per process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use sharebox_core::config::storage::StorageSettings;
use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;

const DEFAULT_INTERNAL_PORT: u16 = 9379;
const DEFAULT_INTERNAL_REGION: &str = "default";
const DEFAULT_INTERNAL_BUCKET: &str = "palmr-files";

/// Canonical connection settings of the object store.
#[derive(Clone, Serialize)]
pub struct StorageConfig {
    /// Host name of the endpoint.
    pub endpoint: String,
    /// Optional port.
    pub port: Option<u16>,
    /// Use HTTPS.
    pub use_ssl: bool,
    /// Access key id.
    pub access_key: String,
    /// Secret access key.
    #[serde(skip)]
    pub secret_key: String,
    /// Region name.
    pub region: String,
    /// Bucket name.
    pub bucket_name: String,
    /// Path-style bucket addressing.
    pub force_path_style: bool,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("access_key", &self.access_key)
            .field("secret_key", &"****")
            .field("region", &self.region)
            .field("bucket_name", &self.bucket_name)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

impl StorageConfig {
    /// `http(s)://endpoint[:port]`.
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        match self.port {
            Some(port) => format!("{scheme}://{}:{port}", self.endpoint),
            None => format!("{scheme}://{}", self.endpoint),
        }
    }

    /// Names of the required settings that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("S3_ENDPOINT", &self.endpoint),
            ("S3_ACCESS_KEY", &self.access_key),
            ("S3_SECRET_KEY", &self.secret_key),
            ("S3_REGION", &self.region),
            ("S3_BUCKET_NAME", &self.bucket_name),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Fail with a remediation hint unless every required field is set.
    pub fn validate(&self) -> AppResult<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            return Ok(());
        }
        Err(AppError::configuration(format!(
            "Object storage is not fully configured; missing {}. Set them in the environment \
             or provide the internal credentials file.",
            missing.join(", ")
        ))
        .with_details(serde_json::json!({ "missing": missing })))
    }
}

/// Where the canonical record came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "path", rename_all = "snake_case")]
pub enum ConfigSource {
    /// The internal credentials artifact.
    CredentialsFile(PathBuf),
    /// Environment-style settings.
    Environment,
}

/// Output of [`resolve`].
#[derive(Debug, Clone)]
pub struct ResolvedStorage {
    /// The canonical record.
    pub config: StorageConfig,
    /// Its origin.
    pub source: ConfigSource,
    /// Whether the operator asked for an external S3 endpoint.
    pub external: bool,
}

/// Resolve the storage configuration, reading the credentials artifact
/// from disk when internal mode is selected.
pub async fn resolve(settings: &StorageSettings) -> ResolvedStorage {
    let path = Path::new(&settings.credentials_path);
    let artifact = if settings.enable_s3 {
        None
    } else {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read storage credentials file");
                None
            }
        }
    };
    resolve_with(settings, artifact.as_deref())
}

/// Resolve from already-loaded artifact text. `artifact` is ignored when
/// external storage is enabled.
pub fn resolve_with(settings: &StorageSettings, artifact: Option<&str>) -> ResolvedStorage {
    if !settings.enable_s3 {
        if let Some(text) = artifact {
            let values = parse_credentials(text);
            tracing::info!(path = %settings.credentials_path, "Using internal storage credentials");
            return ResolvedStorage {
                config: from_credentials(&values),
                source: ConfigSource::CredentialsFile(PathBuf::from(&settings.credentials_path)),
                external: false,
            };
        }
    }

    ResolvedStorage {
        config: StorageConfig {
            endpoint: settings.endpoint.clone(),
            port: settings.port,
            use_ssl: settings.use_ssl,
            access_key: settings.access_key.clone(),
            secret_key: settings.secret_key.clone(),
            region: settings.region.clone(),
            bucket_name: settings.bucket_name.clone(),
            force_path_style: settings.force_path_style,
        },
        source: ConfigSource::Environment,
        external: settings.enable_s3,
    }
}

/// Parse `KEY=VALUE` lines. The value may itself contain `=`; lines
/// without a separator and `#` comments are ignored.
pub fn parse_credentials(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

fn from_credentials(values: &HashMap<String, String>) -> StorageConfig {
    let get = |key: &str| values.get(key).cloned().unwrap_or_default();
    let non_empty = |key: &str, default: &str| {
        values
            .get(key)
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| default.to_string())
    };

    StorageConfig {
        endpoint: get("S3_ENDPOINT"),
        port: Some(
            values
                .get("S3_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_INTERNAL_PORT),
        ),
        use_ssl: get("S3_USE_SSL") == "true",
        access_key: get("S3_ACCESS_KEY"),
        secret_key: get("S3_SECRET_KEY"),
        region: non_empty("S3_REGION", DEFAULT_INTERNAL_REGION),
        bucket_name: non_empty("S3_BUCKET_NAME", DEFAULT_INTERNAL_BUCKET),
        force_path_style: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIFACT: &str = "\
S3_ENDPOINT=127.0.0.1
S3_ACCESS_KEY = palmr
S3_SECRET_KEY=abc=def
S3_USE_SSL=false
";

    #[test]
    fn test_internal_artifact_is_used_with_defaults() {
        let settings = StorageSettings::default();
        let resolved = resolve_with(&settings, Some(ARTIFACT));

        assert_eq!(resolved.source, ConfigSource::CredentialsFile(PathBuf::from(&settings.credentials_path)));
        assert!(!resolved.external);
        assert_eq!(resolved.config.endpoint, "127.0.0.1");
        assert_eq!(resolved.config.access_key, "palmr");
        assert_eq!(resolved.config.secret_key, "abc=def");
        assert_eq!(resolved.config.port, Some(9379));
        assert_eq!(resolved.config.region, "default");
        assert_eq!(resolved.config.bucket_name, "palmr-files");
        assert!(resolved.config.force_path_style);
        assert_eq!(resolved.config.endpoint_url(), "http://127.0.0.1:9379");
        assert!(resolved.config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_resolve_reads_artifact_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".minio-credentials");
        tokio::fs::write(&path, ARTIFACT).await.unwrap();
        let settings = StorageSettings {
            credentials_path: path.to_string_lossy().into_owned(),
            ..StorageSettings::default()
        };

        let resolved = resolve(&settings).await;
        assert_eq!(resolved.source, ConfigSource::CredentialsFile(path));
        assert_eq!(resolved.config.secret_key, "abc=def");

        let absent = StorageSettings {
            credentials_path: dir.path().join("missing").to_string_lossy().into_owned(),
            ..StorageSettings::default()
        };
        assert_eq!(resolve(&absent).await.source, ConfigSource::Environment);
    }

    #[test]
    fn test_external_flag_ignores_artifact() {
        let settings = StorageSettings {
            enable_s3: true,
            endpoint: "s3.amazonaws.com".to_string(),
            use_ssl: true,
            access_key: "AK".to_string(),
            secret_key: "SK".to_string(),
            region: "eu-west-1".to_string(),
            bucket_name: "files".to_string(),
            ..StorageSettings::default()
        };
        let resolved = resolve_with(&settings, Some(ARTIFACT));

        assert_eq!(resolved.source, ConfigSource::Environment);
        assert!(resolved.external);
        assert_eq!(resolved.config.endpoint_url(), "https://s3.amazonaws.com");
        assert!(!resolved.config.force_path_style);
    }

    #[test]
    fn test_missing_artifact_falls_back_to_environment() {
        let settings = StorageSettings {
            endpoint: "minio".to_string(),
            ..StorageSettings::default()
        };
        let resolved = resolve_with(&settings, None);

        assert_eq!(resolved.source, ConfigSource::Environment);
        assert!(!resolved.external);
        let err = resolved.config.validate().unwrap_err();
        assert_eq!(err.kind, sharebox_core::error::ErrorKind::Configuration);
        assert!(err.message.contains("S3_ACCESS_KEY"));
        assert!(err.message.contains("S3_BUCKET_NAME"));
        assert!(!err.message.contains("S3_ENDPOINT"));
    }

    #[test]
    fn test_debug_hides_secret() {
        let resolved = resolve_with(&StorageSettings::default(), Some(ARTIFACT));
        let rendered = format!("{:?}", resolved.config);
        assert!(!rendered.contains("abc=def"));
    }
}
