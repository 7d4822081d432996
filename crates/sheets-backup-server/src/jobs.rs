//! Registry of backup jobs started over HTTP.
//!
//! At most one job runs at a time. Each job gets a child of the registry's
//! shutdown token, so stopping the service cancels whatever is running.
//! The most recent finished jobs stay queryable; older ones are evicted.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use sheets_backup_core::{BackupError, BackupJob, CancellationToken, RunReport};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::error::ApiError;

/// Finished jobs kept for the status endpoint.
pub const DEFAULT_JOB_HISTORY_LIMIT: usize = 20;

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Running,
    Completed { report: RunReport },
    Failed { error: String },
    /// Cancelled by request, deadline or shutdown; `report` covers the
    /// items that finished before the cancellation took effect.
    Cancelled { report: Option<RunReport> },
}

/// Point-in-time view of a job, as returned by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub root_folder_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub state: JobState,
}

struct JobRecord {
    snapshot: JobSnapshot,
    cancel: CancellationToken,
}

pub struct JobRegistry {
    job: Arc<BackupJob>,
    jobs: DashMap<Uuid, JobRecord>,
    /// Id of the running job, if any. Guards the check-then-start.
    active: Mutex<Option<Uuid>>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    timeout: Option<Duration>,
    history_limit: usize,
}

impl JobRegistry {
    pub fn new(job: Arc<BackupJob>, timeout: Option<Duration>) -> Self {
        Self {
            job,
            jobs: DashMap::new(),
            active: Mutex::new(None),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            timeout,
            history_limit: DEFAULT_JOB_HISTORY_LIMIT,
        }
    }

    /// Number of finished jobs to keep (at least one).
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn default_root_folder_id(&self) -> &str {
        &self.job.config().root_folder_id
    }

    pub fn running_job(&self) -> Option<Uuid> {
        *self.active.lock().expect("job registry poisoned")
    }

    /// Start a backup on a background task and return its id immediately.
    pub fn start(self: &Arc<Self>, root_folder_id: String) -> Result<Uuid, ApiError> {
        if self.shutdown.is_cancelled() {
            return Err(ApiError::ShuttingDown);
        }

        let mut active = self.active.lock().expect("job registry poisoned");
        if let Some(running) = *active {
            return Err(ApiError::JobAlreadyRunning(running));
        }

        let job_id = Uuid::new_v4();
        let cancel = self.shutdown.child_token();
        self.jobs.insert(
            job_id,
            JobRecord {
                snapshot: JobSnapshot {
                    job_id,
                    root_folder_id: root_folder_id.clone(),
                    started_at: Utc::now(),
                    finished_at: None,
                    state: JobState::Running,
                },
                cancel: cancel.clone(),
            },
        );
        *active = Some(job_id);
        drop(active);

        info!(%job_id, root_folder_id = %root_folder_id, "Backup job accepted");

        let registry = Arc::clone(self);
        let span = tracing::info_span!("backup_job", %job_id);
        self.tracker.spawn(
            async move {
                let state = registry.execute(&root_folder_id, &cancel).await;
                registry.finish(job_id, state);
            }
            .instrument(span),
        );

        Ok(job_id)
    }

    async fn execute(&self, root_folder_id: &str, cancel: &CancellationToken) -> JobState {
        let run = self.job.start_backup(root_folder_id, cancel);
        tokio::pin!(run);

        let result = match self.timeout {
            Some(timeout) => {
                tokio::select! {
                    result = &mut run => result,
                    _ = tokio::time::sleep(timeout) => {
                        warn!(timeout_secs = timeout.as_secs(), "Backup job hit its deadline, cancelling");
                        cancel.cancel();
                        run.await
                    }
                }
            }
            None => run.await,
        };

        match result {
            Ok(report) if cancel.is_cancelled() => JobState::Cancelled {
                report: Some(report),
            },
            Ok(report) => JobState::Completed { report },
            Err(BackupError::Cancelled) => JobState::Cancelled { report: None },
            Err(e) => {
                error!(error = %e, "Backup job failed");
                JobState::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    fn finish(&self, job_id: Uuid, state: JobState) {
        // Same lock order as `start`: a finished job is never observed
        // while it still blocks new triggers.
        let mut active = self.active.lock().expect("job registry poisoned");
        if let Some(mut record) = self.jobs.get_mut(&job_id) {
            record.snapshot.finished_at = Some(Utc::now());
            record.snapshot.state = state;
        }
        if *active == Some(job_id) {
            *active = None;
        }
        drop(active);

        self.evict_finished();
    }

    /// Drop the oldest finished jobs beyond the history limit.
    fn evict_finished(&self) {
        let mut finished: Vec<(DateTime<Utc>, Uuid)> = self
            .jobs
            .iter()
            .filter_map(|record| {
                record
                    .snapshot
                    .finished_at
                    .map(|finished_at| (finished_at, *record.key()))
            })
            .collect();
        if finished.len() <= self.history_limit {
            return;
        }

        finished.sort();
        let excess = finished.len() - self.history_limit;
        for (_, job_id) in finished.into_iter().take(excess) {
            self.jobs.remove(&job_id);
            debug!(%job_id, "Evicted finished job");
        }
    }

    pub fn get(&self, job_id: Uuid) -> Option<JobSnapshot> {
        self.jobs.get(&job_id).map(|record| record.snapshot.clone())
    }

    /// Request cancellation. In-flight items finish; the job then settles
    /// into `Cancelled`.
    pub fn cancel(&self, job_id: Uuid) -> Result<JobSnapshot, ApiError> {
        let record = self
            .jobs
            .get(&job_id)
            .ok_or(ApiError::JobNotFound(job_id))?;

        if record.snapshot.state == JobState::Running {
            info!(%job_id, "Cancellation requested");
            record.cancel.cancel();
        }
        Ok(record.snapshot.clone())
    }

    /// Cancel running jobs, refuse new ones, and wait for them to settle.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        if !self.tracker.is_empty() {
            info!("Waiting for running backup job to stop");
        }
        self.tracker.wait().await;
    }
}
