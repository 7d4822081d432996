//! One complete backup run: token → discovery → pipeline → report.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::auth::TokenProvider;
use crate::config::BackupConfig;
use crate::drive::{DirectoryLister, DocumentExporter, ShortcutResolver};
use crate::error::BackupError;
use crate::model::RunReport;
use crate::pipeline::BackupPipeline;
use crate::storage::ObjectUploader;
use crate::walker::TreeWalker;

/// Wires the walker and the pipeline together for a configured bucket.
#[derive(Clone)]
pub struct BackupJob {
    walker: TreeWalker,
    pipeline: BackupPipeline,
    tokens: Arc<dyn TokenProvider>,
    config: BackupConfig,
}

impl BackupJob {
    /// Build a job from a validated configuration.
    ///
    /// `drive` provides listing, shortcut resolution and export; in
    /// practice this is one Drive API backend.
    pub fn new<D>(
        config: BackupConfig,
        drive: Arc<D>,
        uploader: Arc<dyn ObjectUploader>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, BackupError>
    where
        D: DirectoryLister + ShortcutResolver + DocumentExporter + 'static,
    {
        let prefix = config.validate()?;

        let lister: Arc<dyn DirectoryLister> = drive.clone();
        let resolver: Arc<dyn ShortcutResolver> = drive.clone();
        let exporter: Arc<dyn DocumentExporter> = drive;

        let walker = TreeWalker::new(lister, resolver, tokens.clone())
            .with_concurrency(config.concurrency_limit)
            .with_shortcut_chain_depth(config.shortcut_chain_depth);

        let pipeline = BackupPipeline::new(
            exporter,
            uploader,
            tokens.clone(),
            config.bucket_name.clone(),
        )
        .with_prefix(prefix)
        .with_concurrency(config.concurrency_limit);

        Ok(Self {
            walker,
            pipeline,
            tokens,
            config,
        })
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Back up every spreadsheet under `root_folder_id`.
    ///
    /// Only an authentication failure or an unreadable root folder fail the
    /// run; everything else is reported in the returned `RunReport`.
    #[instrument(skip(self, cancel), level = "info")]
    pub async fn start_backup(
        &self,
        root_folder_id: &str,
        cancel: &CancellationToken,
    ) -> Result<RunReport, BackupError> {
        let started_at = Utc::now();
        info!(bucket = %self.config.bucket_name, "Starting backup");

        // Fail fast before touching the drive; later calls hit the cache.
        self.tokens.access_token().await.map_err(|e| match e {
            BackupError::Auth(_) => e,
            other => BackupError::Auth(other.to_string()),
        })?;

        let discovery = match self.walker.discover(root_folder_id, cancel).await {
            Ok(discovery) => discovery,
            Err(e) => {
                error!(error = %e, "Backup aborted during discovery");
                return Err(e);
            }
        };

        let mut report = self
            .pipeline
            .run(&discovery.targets, cancel)
            .await
            .with_skipped_nodes(discovery.skipped);
        report.started_at = started_at;

        if report.is_clean() {
            info!(
                succeeded = report.succeeded,
                bytes = report.bytes_uploaded(),
                "Backup completed"
            );
        } else {
            warn!(
                succeeded = report.succeeded,
                failed = report.failed,
                cancelled = report.cancelled,
                skipped_nodes = report.skipped_nodes.len(),
                "Backup completed with problems"
            );
        }

        Ok(report)
    }
}
