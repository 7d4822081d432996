//! Export → upload pipeline with per-item failure isolation.
//!
//! Every target is handled independently: a failed export or upload is
//! recorded in its outcome and never stops the other items. Nothing is
//! retried here; a failed item stays failed for this run.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::auth::TokenProvider;
use crate::config::DEFAULT_CONCURRENCY_LIMIT;
use crate::drive::DocumentExporter;
use crate::layout::{DestinationPrefix, ObjectKeyLayout};
use crate::model::{BackupOutcome, BackupStatus, BackupTarget, RunReport};
use crate::storage::ObjectUploader;

/// Backs up a list of targets into one bucket.
#[derive(Clone)]
pub struct BackupPipeline {
    exporter: Arc<dyn DocumentExporter>,
    uploader: Arc<dyn ObjectUploader>,
    tokens: Arc<dyn TokenProvider>,
    bucket: String,
    prefix: DestinationPrefix,
    concurrency: usize,
}

impl BackupPipeline {
    pub fn new(
        exporter: Arc<dyn DocumentExporter>,
        uploader: Arc<dyn ObjectUploader>,
        tokens: Arc<dyn TokenProvider>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            exporter,
            uploader,
            tokens,
            bucket: bucket.into(),
            prefix: DestinationPrefix::default(),
            concurrency: DEFAULT_CONCURRENCY_LIMIT,
        }
    }

    pub fn with_prefix(mut self, prefix: DestinationPrefix) -> Self {
        self.prefix = prefix;
        self
    }

    /// Maximum number of targets in flight at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Back up every target and aggregate the outcomes in target order.
    ///
    /// Once `cancel` fires, targets that have not started yet are reported
    /// as `Cancelled`; targets already in flight run to completion.
    #[instrument(skip_all, fields(targets = targets.len(), bucket = %self.bucket))]
    pub async fn run(&self, targets: &[BackupTarget], cancel: &CancellationToken) -> RunReport {
        let started_at = Utc::now();
        let layout = ObjectKeyLayout::for_run(&self.prefix, started_at);
        warn_on_key_collisions(&layout, targets);

        let layout = &layout;
        let pending: Vec<_> = targets
            .iter()
            .enumerate()
            .map(|(index, target)| async move {
                if cancel.is_cancelled() {
                    return (index, BackupOutcome::cancelled(target));
                }
                (index, self.back_up(target, layout).await)
            })
            .collect();
        let mut indexed: Vec<(usize, BackupOutcome)> = stream::iter(pending)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        indexed.sort_by_key(|(index, _)| *index);
        let outcomes = indexed.into_iter().map(|(_, outcome)| outcome).collect();
        let report = RunReport::from_outcomes(outcomes, started_at);

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            cancelled = report.cancelled,
            bytes = report.bytes_uploaded(),
            "Pipeline finished"
        );
        report
    }

    /// Export one spreadsheet and upload it.
    async fn back_up(&self, target: &BackupTarget, layout: &ObjectKeyLayout) -> BackupOutcome {
        let key = layout.object_key(&target.display_name);

        let token = match self.tokens.access_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(source_id = %target.source_id, error = %e, "No token for export");
                return BackupOutcome::failed(target, BackupStatus::ExportFailed, e);
            }
        };

        let data = match self
            .exporter
            .export_spreadsheet(&target.source_id, &token)
            .await
        {
            Ok(data) => data,
            Err(e) => {
                warn!(source_id = %target.source_id, error = %e, "Export failed");
                return BackupOutcome::failed(target, BackupStatus::ExportFailed, e);
            }
        };

        let size = data.len() as u64;
        if let Err(e) = self
            .uploader
            .put_object(&self.bucket, &key, data, &token)
            .await
        {
            warn!(source_id = %target.source_id, key = %key, error = %e, "Upload failed");
            return BackupOutcome::failed(target, BackupStatus::UploadFailed, e);
        }

        debug!(source_id = %target.source_id, key = %key, size, "Backed up spreadsheet");
        BackupOutcome::success(target, key, size)
    }
}

/// Distinct documents sharing a name overwrite each other's backup.
fn warn_on_key_collisions(layout: &ObjectKeyLayout, targets: &[BackupTarget]) {
    let mut keys: HashMap<String, usize> = HashMap::new();
    for target in targets {
        *keys.entry(layout.object_key(&target.display_name)).or_default() += 1;
    }
    for (key, count) in keys.into_iter().filter(|(_, count)| *count > 1) {
        warn!(key = %key, count, "Several documents map to the same object key; last upload wins");
    }
}
