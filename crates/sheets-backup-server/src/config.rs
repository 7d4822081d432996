use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use sheets_backup_core::{BackupConfig, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_SHORTCUT_CHAIN_DEPTH};

use crate::jobs::DEFAULT_JOB_HISTORY_LIMIT;

/// Destination bucket flavour.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Google Cloud Storage, authenticated with the Drive service account
    Gcs,
    /// AWS S3 or an S3-compatible store (Cloudflare R2, MinIO)
    S3,
}

/// Configuration for the sheets-backup trigger service.
#[derive(Parser, Debug, Clone)]
#[command(name = "sheets-backup-server")]
#[command(about = "Backs up every Google Sheets spreadsheet under a Drive folder to a bucket")]
pub struct Config {
    /// TCP host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    /// TCP port to bind to
    #[arg(long, default_value = "8080", env = "PORT")]
    pub port: u16,

    /// Drive folder the backup starts from
    #[arg(long, env = "ROOT_FOLDER_ID")]
    pub root_folder_id: String,

    /// Destination bucket
    #[arg(long, env = "BUCKET_NAME")]
    pub bucket_name: String,

    #[arg(long, value_enum, default_value_t = StorageBackend::Gcs, env = "STORAGE_BACKEND")]
    pub storage_backend: StorageBackend,

    /// Object key prefix; strftime patterns are expanded per run (`backups/%Y-%m-%d`)
    #[arg(long, default_value = "", env = "DESTINATION_PREFIX")]
    pub destination_prefix: String,

    /// Maximum concurrent Drive and bucket requests
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY_LIMIT, env = "CONCURRENCY_LIMIT")]
    pub concurrency_limit: usize,

    /// Shortcut hops followed before giving up (0 ignores shortcuts)
    #[arg(long, default_value_t = DEFAULT_SHORTCUT_CHAIN_DEPTH, env = "SHORTCUT_CHAIN_DEPTH")]
    pub shortcut_chain_depth: u32,

    /// Cancel a job still running after this many seconds (0 = no deadline)
    #[arg(long, default_value = "0", env = "JOB_TIMEOUT_SECS")]
    pub job_timeout_secs: u64,

    /// Finished jobs kept for GET /jobs/{id}
    #[arg(long, default_value_t = DEFAULT_JOB_HISTORY_LIMIT, env = "JOB_HISTORY_LIMIT")]
    pub job_history_limit: usize,

    /// Service account key JSON, inline
    #[arg(long, env = "GOOGLE_CLOUD_CREDENTIALS", hide_env_values = true)]
    pub google_cloud_credentials: Option<String>,

    /// Path to a service account key file
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub google_application_credentials: Option<PathBuf>,

    /// Pre-issued OAuth access token, used instead of a service account
    #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// S3-compatible endpoint (e.g. https://{account}.r2.cloudflarestorage.com)
    #[arg(long, env = "S3_ENDPOINT_URL")]
    pub s3_endpoint_url: Option<String>,

    #[arg(long, default_value = "auto", env = "S3_REGION")]
    pub s3_region: String,

    #[arg(long, env = "S3_ACCESS_KEY_ID")]
    pub s3_access_key_id: Option<String>,

    #[arg(long, env = "S3_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub s3_secret_access_key: Option<String>,

    /// Run one backup in the foreground, print the report as JSON and exit
    #[arg(long)]
    pub once: bool,
}

impl Config {
    pub fn backup_config(&self) -> BackupConfig {
        BackupConfig {
            root_folder_id: self.root_folder_id.clone(),
            bucket_name: self.bucket_name.clone(),
            destination_prefix: self.destination_prefix.clone(),
            concurrency_limit: self.concurrency_limit,
            shortcut_chain_depth: self.shortcut_chain_depth,
        }
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }
}
