//! S3-compatible object-store provider.
//!
//! One [`Client`] talks to the configured endpoint for every server-side
//! operation. URLs handed to browsers are signed by a second client whose
//! endpoint is the public storage URL in internal mode; it is built on
//! first use so deployments that never mint public links do not need
//! `STORAGE_URL`.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as S3ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use bytes::Bytes;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use sharebox_core::error::{AppError, ErrorKind};
use sharebox_core::result::AppResult;
use sharebox_core::traits::storage::{ByteStream, CompletedPart, ProviderKind, StorageProvider};

use crate::disposition::{content_type_for, encode_filename_for_header, fallback_name};
use crate::resolver::StorageConfig;
use crate::strategy::MISSING_STORAGE_URL;
use crate::tls;

/// Object-store provider backed by the AWS SDK.
#[derive(Debug)]
pub struct S3StorageProvider {
    client: Client,
    config: StorageConfig,
    is_internal: bool,
    public_url: Option<String>,
    public_client: OnceLock<Client>,
}

impl S3StorageProvider {
    /// Construct the provider. Fails fast when the endpoint or the
    /// credentials are missing.
    pub fn connect(
        config: &StorageConfig,
        is_internal: bool,
        public_url: Option<String>,
    ) -> AppResult<Self> {
        config.validate()?;
        let client = build_client(&config.endpoint_url(), config, tls::accept_invalid_certs());

        info!(
            endpoint = %config.endpoint_url(),
            bucket = %config.bucket_name,
            region = %config.region,
            internal = is_internal,
            "S3 storage provider initialized"
        );

        Ok(Self {
            client,
            config: config.clone(),
            is_internal,
            public_url: public_url.filter(|u| !u.trim().is_empty()),
            public_client: OnceLock::new(),
        })
    }

    fn bucket(&self) -> &str {
        &self.config.bucket_name
    }

    /// Client used to sign URLs that leave this server.
    fn public_client(&self) -> AppResult<&Client> {
        if let Some(client) = self.public_client.get() {
            return Ok(client);
        }

        let endpoint = if self.is_internal {
            self.public_url
                .as_deref()
                .map(|u| u.trim_end_matches('/').to_string())
                .ok_or_else(|| AppError::configuration(MISSING_STORAGE_URL))?
        } else {
            self.config.endpoint_url()
        };

        debug!(endpoint = %endpoint, "Building public presigning client");
        let client = build_client(&endpoint, &self.config, tls::accept_invalid_certs());
        Ok(self.public_client.get_or_init(|| client))
    }

    async fn sign_put(&self, client: &Client, object_name: &str, expires_in: u64) -> AppResult<String> {
        let request = client
            .put_object()
            .bucket(self.bucket())
            .key(object_name)
            .presigned(presigning(expires_in)?)
            .await
            .map_err(|e| sdk_error("Failed to presign upload", e))?;
        Ok(request.uri().to_string())
    }
}

fn build_client(endpoint: &str, config: &StorageConfig, accept_invalid_certs: bool) -> Client {
    let credentials = Credentials::new(
        config.access_key.clone(),
        config.secret_key.clone(),
        None,
        None,
        "sharebox",
    );

    let mut builder = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .endpoint_url(endpoint)
        .credentials_provider(credentials)
        .region(Region::new(config.region.clone()))
        .force_path_style(config.force_path_style);
    if let Some(http_client) = tls::s3_http_client(accept_invalid_certs) {
        builder = builder.http_client(http_client);
    }

    Client::from_conf(builder.build())
}

fn presigning(expires_in: u64) -> AppResult<PresigningConfig> {
    PresigningConfig::expires_in(Duration::from_secs(expires_in)).map_err(|e| {
        AppError::with_source(
            ErrorKind::Validation,
            format!("Invalid presigned URL expiry: {expires_in}s"),
            e,
        )
    })
}

fn sdk_error<E, R>(context: &str, err: SdkError<E, R>) -> AppError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let kind = match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => ErrorKind::TransientIo,
        _ => ErrorKind::Storage,
    };
    let message = format!("{context}: {}", DisplayErrorContext(&err));
    AppError::with_source(kind, message, err)
}

fn is_http_404<E>(err: &SdkError<E, HttpResponse>) -> bool {
    err.raw_response()
        .is_some_and(|r| r.status().as_u16() == 404)
}

#[async_trait]
impl StorageProvider for S3StorageProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ObjectStore
    }

    async fn health_check(&self) -> AppResult<bool> {
        match self.client.head_bucket().bucket(self.bucket()).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(bucket = %self.bucket(), error = %DisplayErrorContext(&e), "Bucket health check failed");
                Ok(false)
            }
        }
    }

    async fn presigned_put_url(&self, object_name: &str, expires_in: u64) -> AppResult<String> {
        let client = self.public_client()?;
        self.sign_put(client, object_name, expires_in).await
    }

    async fn presigned_get_url(
        &self,
        object_name: &str,
        expires_in: u64,
        display_name: Option<&str>,
    ) -> AppResult<String> {
        let client = self.public_client()?;
        let name = display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| fallback_name(object_name));

        let request = client
            .get_object()
            .bucket(self.bucket())
            .key(object_name)
            .response_content_disposition(encode_filename_for_header(name))
            .response_content_type(content_type_for(name))
            .presigned(presigning(expires_in)?)
            .await
            .map_err(|e| sdk_error("Failed to presign download", e))?;
        Ok(request.uri().to_string())
    }

    async fn backend_get_url(&self, object_name: &str, expires_in: u64) -> AppResult<String> {
        let request = self
            .client
            .get_object()
            .bucket(self.bucket())
            .key(object_name)
            .presigned(presigning(expires_in)?)
            .await
            .map_err(|e| sdk_error("Failed to presign download", e))?;
        Ok(request.uri().to_string())
    }

    async fn backend_put_url(&self, object_name: &str, expires_in: u64) -> AppResult<String> {
        self.sign_put(&self.client, object_name, expires_in).await
    }

    async fn delete_object(&self, object_name: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(self.bucket())
            .key(object_name)
            .send()
            .await
            .map_err(|e| sdk_error("Failed to delete object", e))?;
        debug!(object_name, "Object deleted");
        Ok(())
    }

    async fn file_exists(&self, object_name: &str) -> AppResult<bool> {
        match self
            .client
            .head_object()
            .bucket(self.bucket())
            .key(object_name)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|s| s.is_not_found()) || is_http_404(&e) => {
                Ok(false)
            }
            Err(e) => Err(sdk_error("Failed to check object existence", e)),
        }
    }

    async fn get_object_stream(&self, object_name: &str) -> AppResult<ByteStream> {
        let output = match self
            .client
            .get_object()
            .bucket(self.bucket())
            .key(object_name)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(|s| s.is_no_such_key()) || is_http_404(&e) => {
                return Err(AppError::not_found(format!("Object not found: {object_name}")));
            }
            Err(e) => return Err(sdk_error("Failed to read object", e)),
        };

        let reader = output.body.into_async_read();
        Ok(Box::pin(ReaderStream::new(reader)))
    }

    async fn put_object(&self, object_name: &str, data: Bytes) -> AppResult<()> {
        self.client
            .put_object()
            .bucket(self.bucket())
            .key(object_name)
            .content_type(content_type_for(object_name))
            .body(S3ByteStream::from(data))
            .send()
            .await
            .map_err(|e| sdk_error("Failed to upload object", e))?;
        Ok(())
    }

    async fn put_object_from_path(&self, object_name: &str, path: &Path) -> AppResult<u64> {
        let size = tokio::fs::metadata(path).await?.len();
        let body = S3ByteStream::from_path(path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to open {} for upload", path.display()),
                e,
            )
        })?;

        self.client
            .put_object()
            .bucket(self.bucket())
            .key(object_name)
            .content_type(content_type_for(object_name))
            .content_length(i64::try_from(size).unwrap_or(i64::MAX))
            .body(body)
            .send()
            .await
            .map_err(|e| sdk_error("Failed to upload object", e))?;

        debug!(object_name, bytes = size, "Uploaded object from file");
        Ok(size)
    }

    async fn create_multipart_upload(&self, object_name: &str) -> AppResult<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(self.bucket())
            .key(object_name)
            .content_type(content_type_for(object_name))
            .send()
            .await
            .map_err(|e| sdk_error("Failed to create multipart upload", e))?;

        output
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| AppError::storage("Store returned no upload id for multipart upload"))
    }

    async fn presigned_part_url(
        &self,
        object_name: &str,
        upload_id: &str,
        part_number: i32,
        expires_in: u64,
    ) -> AppResult<String> {
        let client = self.public_client()?;
        let request = client
            .upload_part()
            .bucket(self.bucket())
            .key(object_name)
            .upload_id(upload_id)
            .part_number(part_number)
            .presigned(presigning(expires_in)?)
            .await
            .map_err(|e| sdk_error("Failed to presign part upload", e))?;
        Ok(request.uri().to_string())
    }

    async fn complete_multipart_upload(
        &self,
        object_name: &str,
        upload_id: &str,
        mut parts: Vec<CompletedPart>,
    ) -> AppResult<()> {
        parts.sort_by_key(|p| p.part_number);
        let parts = parts
            .into_iter()
            .map(|p| {
                S3CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(p.etag)
                    .build()
            })
            .collect::<Vec<_>>();

        self.client
            .complete_multipart_upload()
            .bucket(self.bucket())
            .key(object_name)
            .upload_id(upload_id)
            .multipart_upload(CompletedMultipartUpload::builder().set_parts(Some(parts)).build())
            .send()
            .await
            .map_err(|e| sdk_error("Failed to complete multipart upload", e))?;
        Ok(())
    }

    async fn abort_multipart_upload(&self, object_name: &str, upload_id: &str) -> AppResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(self.bucket())
            .key(object_name)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| sdk_error("Failed to abort multipart upload", e))?;
        Ok(())
    }
}
