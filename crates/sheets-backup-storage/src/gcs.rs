//! Google Cloud Storage uploader (JSON API, simple media upload).
//!
//! Authenticates with the same bearer token as the Drive calls, so one
//! service account covers both sides of the backup.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client as HttpClient;
use sheets_backup_core::{BackupError, ObjectUploader, XLSX_MIME_TYPE};
use tracing::{debug, instrument, warn};

use sheets_backup_core::retry::{backoff_sleep, is_retryable_status, MAX_RETRIES};

/// Public Cloud Storage endpoint.
pub const GCS_API_BASE: &str = "https://storage.googleapis.com";

pub struct GcsUploader {
    http_client: HttpClient,
    api_base: String,
}

impl Default for GcsUploader {
    fn default() -> Self {
        Self::new()
    }
}

impl GcsUploader {
    pub fn new() -> Self {
        Self::with_base_url(GCS_API_BASE)
    }

    pub fn with_base_url(api_base: impl Into<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn upload_url(&self, bucket: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o",
            self.api_base,
            urlencoding::encode(bucket)
        )
    }
}

#[async_trait]
impl ObjectUploader for GcsUploader {
    #[instrument(skip(self, data, token), level = "debug", fields(size = data.len()))]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        token: &str,
    ) -> Result<(), BackupError> {
        let url = self.upload_url(bucket);
        let upload_error = |message: String| BackupError::Upload {
            key: key.to_string(),
            message,
        };

        for attempt in 0..=MAX_RETRIES {
            let response = self
                .http_client
                .post(&url)
                .bearer_auth(token)
                .query(&[("uploadType", "media"), ("name", key)])
                .header(reqwest::header::CONTENT_TYPE, XLSX_MIME_TYPE)
                .body(data.clone())
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(e) if attempt < MAX_RETRIES => {
                    warn!(attempt, key, error = %e, "GCS upload request failed, retrying");
                    backoff_sleep(attempt).await;
                    continue;
                }
                Err(e) => return Err(upload_error(format!("GCS request failed: {}", e))),
            };

            let status = response.status();
            if status.is_success() {
                debug!("Uploaded gs://{}/{} ({} bytes)", bucket, key, data.len());
                return Ok(());
            }

            if is_retryable_status(status.as_u16()) && attempt < MAX_RETRIES {
                warn!(attempt, key, status = status.as_u16(), "GCS upload retryable error, retrying");
                backoff_sleep(attempt).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(upload_error(format!("GCS upload error {}: {}", status, body)));
        }

        unreachable!()
    }
}
