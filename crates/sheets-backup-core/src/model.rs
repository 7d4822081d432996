use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a node seen while walking the drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Spreadsheet,
    Folder,
    Shortcut,
    Other,
}

/// One node of the drive tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveEntry {
    /// Drive object ID, unique per object within a run
    pub id: String,
    /// Display name, used to build the backup filename
    pub name: String,
    pub kind: EntryKind,
    /// Object the shortcut points to (only set for shortcuts)
    #[serde(default)]
    pub shortcut_target_id: Option<String>,
}

impl DriveEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            shortcut_target_id: None,
        }
    }

    pub fn spreadsheet(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, EntryKind::Spreadsheet)
    }

    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, EntryKind::Folder)
    }

    pub fn shortcut(
        id: impl Into<String>,
        name: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            shortcut_target_id: Some(target_id.into()),
            ..Self::new(id, name, EntryKind::Shortcut)
        }
    }
}

/// A concrete spreadsheet to export and upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackupTarget {
    /// The spreadsheet's own ID, never a shortcut ID
    pub source_id: String,
    pub display_name: String,
}

impl From<&DriveEntry> for BackupTarget {
    fn from(entry: &DriveEntry) -> Self {
        Self {
            source_id: entry.id.clone(),
            display_name: entry.name.clone(),
        }
    }
}

/// A drive node the walker could not expand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedNode {
    pub node_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    Success,
    ExportFailed,
    UploadFailed,
    Cancelled,
}

/// Result of backing up one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupOutcome {
    pub source_id: String,
    pub display_name: String,
    pub status: BackupStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_key: Option<String>,
    #[serde(default)]
    pub bytes_uploaded: u64,
}

impl BackupOutcome {
    pub fn success(target: &BackupTarget, object_key: String, bytes_uploaded: u64) -> Self {
        Self {
            source_id: target.source_id.clone(),
            display_name: target.display_name.clone(),
            status: BackupStatus::Success,
            error_detail: None,
            object_key: Some(object_key),
            bytes_uploaded,
        }
    }

    pub fn failed(target: &BackupTarget, status: BackupStatus, detail: impl ToString) -> Self {
        Self {
            source_id: target.source_id.clone(),
            display_name: target.display_name.clone(),
            status,
            error_detail: Some(detail.to_string()),
            object_key: None,
            bytes_uploaded: 0,
        }
    }

    pub fn cancelled(target: &BackupTarget) -> Self {
        Self {
            source_id: target.source_id.clone(),
            display_name: target.display_name.clone(),
            status: BackupStatus::Cancelled,
            error_detail: None,
            object_key: None,
            bytes_uploaded: 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self.status,
            BackupStatus::ExportFailed | BackupStatus::UploadFailed
        )
    }
}

/// Aggregated, ordered record of one backup run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub targets_discovered: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// One entry per target, in target order
    pub outcomes: Vec<BackupOutcome>,
    /// Folders and shortcuts the walker had to skip
    #[serde(default)]
    pub skipped_nodes: Vec<SkippedNode>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Build a report from outcomes already sorted in target order.
    pub fn from_outcomes(outcomes: Vec<BackupOutcome>, started_at: DateTime<Utc>) -> Self {
        let succeeded = outcomes
            .iter()
            .filter(|o| o.status == BackupStatus::Success)
            .count();
        let failed = outcomes.iter().filter(|o| o.is_failure()).count();
        let cancelled = outcomes
            .iter()
            .filter(|o| o.status == BackupStatus::Cancelled)
            .count();

        Self {
            targets_discovered: outcomes.len(),
            succeeded,
            failed,
            cancelled,
            outcomes,
            skipped_nodes: Vec::new(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn with_skipped_nodes(mut self, skipped: Vec<SkippedNode>) -> Self {
        self.skipped_nodes = skipped;
        self
    }

    /// Total bytes written to the bucket.
    pub fn bytes_uploaded(&self) -> u64 {
        self.outcomes.iter().map(|o| o.bytes_uploaded).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.cancelled == 0 && self.skipped_nodes.is_empty()
    }
}
