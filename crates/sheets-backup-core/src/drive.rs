use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BackupError;
use crate::model::DriveEntry;

/// MIME type of the exported backup files.
pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Lists the immediate children of a drive folder.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    /// List every child of a folder, following pagination.
    ///
    /// # Errors
    /// `BackupError::List` when the folder cannot be read.
    async fn list_children(
        &self,
        folder_id: &str,
        token: &str,
    ) -> Result<Vec<DriveEntry>, BackupError>;
}

/// Looks up the entry a shortcut points to.
#[async_trait]
pub trait ShortcutResolver: Send + Sync {
    /// Fetch and classify the shortcut's destination (one level only).
    ///
    /// The returned entry may itself be a shortcut; the caller decides
    /// whether to follow it further.
    ///
    /// # Errors
    /// `BackupError::Resolve` when the target is missing or unreadable.
    async fn resolve_shortcut(
        &self,
        shortcut: &DriveEntry,
        token: &str,
    ) -> Result<DriveEntry, BackupError>;
}

/// Converts a live spreadsheet into `.xlsx` bytes.
#[async_trait]
pub trait DocumentExporter: Send + Sync {
    async fn export_spreadsheet(&self, source_id: &str, token: &str)
        -> Result<Bytes, BackupError>;
}
