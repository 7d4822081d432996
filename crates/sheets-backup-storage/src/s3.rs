//! S3-compatible uploader (AWS S3, Cloudflare R2, MinIO).
//!
//! Credentials live in the SDK client, so the bearer token handed to
//! `put_object` is not used here.

use aws_config::Region;
use aws_sdk_s3::config::{BehaviorVersion, Credentials};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;

use async_trait::async_trait;
use bytes::Bytes;
use sheets_backup_core::{BackupError, ObjectUploader, XLSX_MIME_TYPE};
use tracing::{debug, instrument, warn};

use sheets_backup_core::retry::{backoff_sleep, is_retryable_status, MAX_RETRIES};

#[derive(Clone)]
pub struct S3Uploader {
    s3_client: S3Client,
}

impl S3Uploader {
    pub fn new(s3_client: S3Client) -> Self {
        Self { s3_client }
    }

    /// Client from the standard AWS environment (env vars, profile, IMDS).
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(S3Client::new(&sdk_config))
    }

    /// Build a path-style client for an S3-compatible endpoint.
    ///
    /// For R2 the endpoint is `https://{account_id}.r2.cloudflarestorage.com`
    /// and the region `auto`.
    pub fn from_endpoint(
        endpoint_url: &str,
        region: &str,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Self {
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "sheets-backup",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.to_string()))
            .endpoint_url(endpoint_url)
            .force_path_style(true)
            .build();

        Self::new(S3Client::from_conf(s3_config))
    }

    /// Check if an S3 error is retryable (429 or 5xx).
    fn is_retryable_s3_error(err: &aws_sdk_s3::error::SdkError<impl std::fmt::Debug>) -> bool {
        use aws_sdk_s3::error::SdkError;
        match err {
            SdkError::ServiceError(e) => is_retryable_status(e.raw().status().as_u16()),
            SdkError::ResponseError(e) => is_retryable_status(e.raw().status().as_u16()),
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => true,
            _ => false,
        }
    }
}

#[async_trait]
impl ObjectUploader for S3Uploader {
    #[instrument(skip(self, data, _token), level = "debug", fields(size = data.len()))]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        _token: &str,
    ) -> Result<(), BackupError> {
        for attempt in 0..=MAX_RETRIES {
            let result = self
                .s3_client
                .put_object()
                .bucket(bucket)
                .key(key)
                .content_type(XLSX_MIME_TYPE)
                .body(ByteStream::from(data.clone()))
                .send()
                .await;

            match result {
                Ok(_) => {
                    debug!("Uploaded s3://{}/{} ({} bytes)", bucket, key, data.len());
                    return Ok(());
                }
                Err(e) => {
                    if Self::is_retryable_s3_error(&e) && attempt < MAX_RETRIES {
                        warn!(attempt, key, "S3 put_object retryable error, retrying");
                        backoff_sleep(attempt).await;
                        continue;
                    }
                    return Err(BackupError::Upload {
                        key: key.to_string(),
                        message: format!("S3 put_object error: {}", e.into_service_error()),
                    });
                }
            }
        }
        unreachable!()
    }
}
