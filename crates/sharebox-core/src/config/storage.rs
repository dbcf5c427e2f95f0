//! Object storage configuration.

use serde::{Deserialize, Serialize};

/// Raw object-storage settings as loaded from TOML and the environment.
///
/// These are resolved into one canonical connection record at startup by
/// `sharebox_storage::resolver`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Use an externally configured S3 endpoint instead of the internal store.
    #[serde(default)]
    pub enable_s3: bool,
    /// Host name of the S3 endpoint.
    #[serde(default)]
    pub endpoint: String,
    /// Optional port of the S3 endpoint.
    #[serde(default)]
    pub port: Option<u16>,
    /// Connect to the endpoint over HTTPS.
    #[serde(default)]
    pub use_ssl: bool,
    /// Access key id.
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_key: String,
    /// Region name.
    #[serde(default)]
    pub region: String,
    /// Bucket holding every object.
    #[serde(default)]
    pub bucket_name: String,
    /// Address buckets by path instead of virtual host.
    #[serde(default)]
    pub force_path_style: bool,
    /// Verify TLS certificates of the endpoint.
    #[serde(default = "default_true")]
    pub reject_unauthorized: bool,
    /// Default lifetime of presigned URLs, in seconds.
    #[serde(default = "default_presigned_expiration")]
    pub presigned_url_expiration: u64,
    /// Public base URL of the storage endpoint (`STORAGE_URL`), required in
    /// internal mode whenever a public link must be minted.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Credentials artifact written by the internal store's provisioning.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
    /// Explicit answer to "can clients reach the storage endpoint directly".
    /// When unset, it is inferred from the storage mode.
    #[serde(default)]
    pub endpoint_publicly_reachable: Option<bool>,
    /// Serve objects from a local directory instead of an object store.
    /// Every transfer is proxied in this mode.
    #[serde(default)]
    pub filesystem_root: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            enable_s3: false,
            endpoint: String::new(),
            port: None,
            use_ssl: false,
            access_key: String::new(),
            secret_key: String::new(),
            region: String::new(),
            bucket_name: String::new(),
            force_path_style: false,
            reject_unauthorized: default_true(),
            presigned_url_expiration: default_presigned_expiration(),
            public_url: None,
            credentials_path: default_credentials_path(),
            endpoint_publicly_reachable: None,
            filesystem_root: None,
        }
    }
}

impl StorageSettings {
    /// Overlay the flat environment names used by existing deployments.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`; tests pass a map.
    /// Empty values are ignored so an exported-but-blank variable does not
    /// wipe a value coming from the TOML files.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("ENABLE_S3") {
            self.enable_s3 = v == "true";
        }
        if let Some(v) = get("S3_ENDPOINT") {
            self.endpoint = v;
        }
        if let Some(v) = get("S3_PORT") {
            match v.parse() {
                Ok(port) => self.port = Some(port),
                Err(_) => tracing::warn!(value = %v, "Ignoring invalid S3_PORT"),
            }
        }
        if let Some(v) = get("S3_USE_SSL") {
            self.use_ssl = v == "true";
        }
        if let Some(v) = get("S3_ACCESS_KEY") {
            self.access_key = v;
        }
        if let Some(v) = get("S3_SECRET_KEY") {
            self.secret_key = v;
        }
        if let Some(v) = get("S3_REGION") {
            self.region = v;
        }
        if let Some(v) = get("S3_BUCKET_NAME") {
            self.bucket_name = v;
        }
        if let Some(v) = get("S3_FORCE_PATH_STYLE") {
            self.force_path_style = v == "true";
        }
        if let Some(v) = get("S3_REJECT_UNAUTHORIZED") {
            self.reject_unauthorized = v != "false";
        }
        if let Some(v) = get("PRESIGNED_URL_EXPIRATION") {
            match v.parse() {
                Ok(secs) => self.presigned_url_expiration = secs,
                Err(_) => tracing::warn!(value = %v, "Ignoring invalid PRESIGNED_URL_EXPIRATION"),
            }
        }
        if let Some(v) = get("STORAGE_URL") {
            self.public_url = Some(v);
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_presigned_expiration() -> u64 {
    3600
}

fn default_credentials_path() -> String {
    "/app/server/.minio-credentials".to_string()
}
