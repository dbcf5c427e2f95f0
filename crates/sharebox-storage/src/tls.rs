//! Certificate verification policy for outbound HTTP.
//!
//! Internal deployments sometimes front their object store with a
//! self-signed certificate. When SSL is on and `S3_REJECT_UNAUTHORIZED`
//! is `false`, certificate verification is disabled for the HTTP clients
//! built here: the `reqwest` transfer clients and the connector handed
//! to the object-store SDK. This is a known security trade-off limited
//! to explicitly opted-in deployments.
//!
//! The decision is taken once per process. An operator-provided
//! `SHAREBOX_TLS_REJECT_UNAUTHORIZED` always wins over the storage
//! settings.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime};

use aws_sdk_s3::config::SharedHttpClient;
use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;
use rustls::client::{ServerCertVerified, ServerCertVerifier};
use rustls::{Certificate, ServerName};

use sharebox_core::error::{AppError, ErrorKind};
use sharebox_core::result::AppResult;

/// Operator override consulted before the storage settings.
pub const TLS_OVERRIDE_ENV: &str = "SHAREBOX_TLS_REJECT_UNAUTHORIZED";

static ACCEPT_INVALID_CERTS: OnceLock<bool> = OnceLock::new();

/// Decide, exactly once, whether invalid certificates are accepted.
///
/// Later calls return the first decision unchanged.
pub fn relax_tls_verification_once(use_ssl: bool, reject_unauthorized: bool) -> bool {
    let existing = std::env::var(TLS_OVERRIDE_ENV).ok();
    *ACCEPT_INVALID_CERTS.get_or_init(|| {
        let relaxed = decide(use_ssl, reject_unauthorized, existing.as_deref());
        if relaxed {
            tracing::warn!(
                "TLS certificate verification is DISABLED for storage traffic \
                 (S3_USE_SSL=true, S3_REJECT_UNAUTHORIZED=false)"
            );
        }
        relaxed
    })
}

/// Whether invalid certificates are currently accepted.
pub fn accept_invalid_certs() -> bool {
    ACCEPT_INVALID_CERTS.get().copied().unwrap_or(false)
}

fn decide(use_ssl: bool, reject_unauthorized: bool, existing: Option<&str>) -> bool {
    match existing.map(str::trim) {
        Some("0") | Some("false") => true,
        Some(_) => false,
        None => use_ssl && !reject_unauthorized,
    }
}

/// Build an HTTP client honouring the verification policy.
pub fn http_client(timeout: Option<Duration>) -> AppResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .danger_accept_invalid_certs(accept_invalid_certs())
        .connect_timeout(Duration::from_secs(30));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Failed to build HTTP client", e))
}

/// HTTP client for the object-store SDK.
///
/// `None` keeps the SDK's default verifying connector.
pub fn s3_http_client(accept_invalid: bool) -> Option<SharedHttpClient> {
    if !accept_invalid {
        return None;
    }

    let tls = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
        .with_no_client_auth();
    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_http1()
        .build();

    Some(HyperClientBuilder::new().build(connector))
}

struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}
