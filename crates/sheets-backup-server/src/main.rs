//! Google Drive spreadsheet backup service.
//!
//! This service:
//! - Accepts a fire-and-forget trigger (POST / or POST /backup)
//! - Walks the configured Drive folder, following subfolders and shortcuts
//! - Exports every Google Sheets spreadsheet as .xlsx into a GCS or S3 bucket
//! - Keeps a RunReport per job, queryable at GET /jobs/{id}

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use sheets_backup_core::{
    BackupJob, CancellationToken, ObjectUploader, StaticTokenProvider, TokenProvider,
};
use sheets_backup_gdrive::{GDriveBackend, GDriveClient, ServiceAccountKey, TokenManager};
use sheets_backup_storage::{GcsUploader, S3Uploader};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod handlers;
mod jobs;

use config::{Config, StorageBackend};
use handlers::{router, AppState};
use jobs::JobRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    info!("Starting sheets-backup-server v{}", env!("CARGO_PKG_VERSION"));
    info!("  Root folder: {}", config.root_folder_id);
    info!("  Bucket: {} ({:?})", config.bucket_name, config.storage_backend);
    if !config.destination_prefix.is_empty() {
        info!("  Prefix: {}", config.destination_prefix);
    }
    info!(
        "  Concurrency: {}, shortcut depth: {}",
        config.concurrency_limit, config.shortcut_chain_depth
    );

    let tokens = build_token_provider(&config)?;
    let uploader = build_uploader(&config).await?;
    let drive = Arc::new(GDriveBackend::new(Arc::new(GDriveClient::new())));
    let job = Arc::new(BackupJob::new(
        config.backup_config(),
        drive,
        uploader,
        tokens,
    )?);

    if config.once {
        return run_once(&job, &config).await;
    }

    let registry = Arc::new(
        JobRegistry::new(job, config.job_timeout()).with_history_limit(config.job_history_limit),
    );
    let app = router(AppState {
        registry: registry.clone(),
    })
    .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    registry.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

fn build_token_provider(config: &Config) -> anyhow::Result<Arc<dyn TokenProvider>> {
    if let Some(token) = &config.access_token {
        info!("  Auth: pre-issued access token (no refresh)");
        return Ok(Arc::new(StaticTokenProvider::new(token.clone())));
    }

    let key = if let Some(json) = &config.google_cloud_credentials {
        ServiceAccountKey::from_json(json).context("GOOGLE_CLOUD_CREDENTIALS")?
    } else if let Some(path) = &config.google_application_credentials {
        ServiceAccountKey::from_file(path)
            .with_context(|| format!("GOOGLE_APPLICATION_CREDENTIALS ({})", path.display()))?
    } else {
        bail!(
            "No Google credentials: set GOOGLE_CLOUD_CREDENTIALS, \
             GOOGLE_APPLICATION_CREDENTIALS or ACCESS_TOKEN"
        );
    };

    let manager = TokenManager::new(key);
    info!("  Auth: service account {}", manager.client_email());
    Ok(Arc::new(manager))
}

async fn build_uploader(config: &Config) -> anyhow::Result<Arc<dyn ObjectUploader>> {
    match config.storage_backend {
        StorageBackend::Gcs => Ok(Arc::new(GcsUploader::new())),
        StorageBackend::S3 => match &config.s3_endpoint_url {
            Some(endpoint) => {
                let (Some(access_key_id), Some(secret_access_key)) =
                    (&config.s3_access_key_id, &config.s3_secret_access_key)
                else {
                    bail!("S3_ENDPOINT_URL requires S3_ACCESS_KEY_ID and S3_SECRET_ACCESS_KEY");
                };
                info!("  S3 endpoint: {}", endpoint);
                Ok(Arc::new(S3Uploader::from_endpoint(
                    endpoint,
                    &config.s3_region,
                    access_key_id,
                    secret_access_key,
                )))
            }
            None => Ok(Arc::new(S3Uploader::from_env().await)),
        },
    }
}

/// Run one backup in the foreground and print its report.
///
/// A run-level failure (auth, unreadable root) exits non-zero; item and
/// node failures are part of a successful report.
async fn run_once(job: &BackupJob, config: &Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    let on_signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        on_signal.cancel();
    });

    if let Some(timeout) = config.job_timeout() {
        let on_deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            warn!(timeout_secs = timeout.as_secs(), "Backup hit its deadline, cancelling");
            on_deadline.cancel();
        });
    }

    let report = job
        .start_backup(&config.root_folder_id, &cancel)
        .await
        .context("Backup run failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, initiating shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, initiating shutdown");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
