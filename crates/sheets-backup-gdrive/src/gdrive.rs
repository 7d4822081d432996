//! Google Drive API v3 client wrapper.
//!
//! Stateless apart from the HTTP connection pool: the bearer token is passed
//! per call. Requests answered with 429 or 5xx are retried with exponential
//! backoff; everything else is returned to the caller.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use sheets_backup_core::retry::{backoff_delay, is_retryable_status, MAX_RETRIES};
use sheets_backup_core::XLSX_MIME_TYPE;
use tracing::{debug, instrument, warn};

use crate::types::{ApiErrorResponse, DriveFile, FilesListResponse, FILE_FIELDS};

/// Public Google APIs endpoint.
pub const GOOGLE_API_BASE: &str = "https://www.googleapis.com";

/// Largest page the files.list endpoint accepts.
const PAGE_SIZE: u32 = 1000;

/// Google Drive API client (stateless, token provided per-call).
#[derive(Clone)]
pub struct GDriveClient {
    http: Client,
    api_base: String,
}

impl Default for GDriveClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GDriveClient {
    pub fn new() -> Self {
        Self::with_base_url(GOOGLE_API_BASE)
    }

    /// Point the client at another endpoint (tests, proxies).
    pub fn with_base_url(api_base: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.api_base)
    }

    /// Send a request, retrying on 429 and 5xx.
    async fn send_with_retry(
        &self,
        build_request: impl Fn() -> RequestBuilder,
    ) -> anyhow::Result<Response> {
        for attempt in 0..=MAX_RETRIES {
            let response = build_request().send().await?;
            let status = response.status();

            if !is_retryable_status(status.as_u16()) || attempt == MAX_RETRIES {
                return Ok(response);
            }

            let delay = backoff_delay(attempt);
            warn!(
                attempt = attempt + 1,
                status = status.as_u16(),
                delay_ms = delay.as_millis() as u64,
                "Google Drive transient error, retrying"
            );
            tokio::time::sleep(delay).await;
        }

        unreachable!()
    }

    /// List every child of a folder (not trashed), following pagination.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn list_children(
        &self,
        token: &str,
        folder_id: &str,
    ) -> anyhow::Result<Vec<DriveFile>> {
        let query = format!("'{}' in parents and trashed = false", folder_id.replace('\'', "\\'"));
        let fields = format!("nextPageToken,files({})", FILE_FIELDS);
        let page_size = PAGE_SIZE.to_string();
        let url = self.files_url();

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let resp = self
                .send_with_retry(|| {
                    let mut request = self.http.get(&url).bearer_auth(token).query(&[
                        ("q", query.as_str()),
                        ("fields", fields.as_str()),
                        ("pageSize", page_size.as_str()),
                        ("supportsAllDrives", "true"),
                        ("includeItemsFromAllDrives", "true"),
                    ]);
                    if let Some(ref page) = page_token {
                        request = request.query(&[("pageToken", page.as_str())]);
                    }
                    request
                })
                .await?;

            let resp = check_status(resp, "list").await?;
            let page: FilesListResponse = resp.json().await?;
            files.extend(page.files);

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!("Listed {} children of folder {}", files.len(), folder_id);
        Ok(files)
    }

    /// Get file metadata. Returns `None` when the file does not exist.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn get_file(&self, token: &str, file_id: &str) -> anyhow::Result<Option<DriveFile>> {
        let url = format!("{}/{}", self.files_url(), file_id);

        let resp = self
            .send_with_retry(|| {
                self.http.get(&url).bearer_auth(token).query(&[
                    ("fields", FILE_FIELDS),
                    ("supportsAllDrives", "true"),
                ])
            })
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let resp = check_status(resp, "get").await?;
        let file: DriveFile = resp.json().await?;
        debug!("Got metadata for file {}: {:?}", file_id, file);
        Ok(Some(file))
    }

    /// Export a Google Sheets document as `.xlsx`.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn export_xlsx(&self, token: &str, file_id: &str) -> anyhow::Result<bytes::Bytes> {
        let url = format!("{}/{}/export", self.files_url(), file_id);

        let resp = self
            .send_with_retry(|| {
                self.http
                    .get(&url)
                    .bearer_auth(token)
                    .query(&[("mimeType", XLSX_MIME_TYPE)])
            })
            .await?;

        let resp = check_status(resp, "export").await?;
        let bytes = resp.bytes().await?;
        debug!("Exported {} bytes for file {}", bytes.len(), file_id);
        Ok(bytes)
    }
}

/// Turn a non-success response into an error carrying Google's message.
async fn check_status(resp: Response, operation: &str) -> anyhow::Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }

    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorResponse>(&body)
        .map(|e| format!("{} {}", e.error.code, e.error.message))
        .unwrap_or_else(|_| format!("{} {}", status.as_u16(), body));
    anyhow::bail!("Google Drive {} error: {}", operation, message)
}
