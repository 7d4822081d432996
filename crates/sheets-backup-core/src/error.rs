//! Error taxonomy for a backup run.
//!
//! Severity decides propagation:
//! - `Auth` and `Traversal` abort the whole run.
//! - `List` and `Resolve` skip one drive node.
//! - `Export` and `Upload` fail one backup target.

/// Errors raised while discovering or backing up documents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackupError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Root folder {folder_id} could not be listed: {message}")]
    Traversal { folder_id: String, message: String },

    #[error("Failed to list folder {folder_id}: {message}")]
    List { folder_id: String, message: String },

    #[error("Failed to resolve shortcut {shortcut_id}: {message}")]
    Resolve { shortcut_id: String, message: String },

    #[error("Failed to export {source_id}: {message}")]
    Export { source_id: String, message: String },

    #[error("Failed to upload {key}: {message}")]
    Upload { key: String, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Backup cancelled")]
    Cancelled,
}

impl BackupError {
    /// Whether this error ends the run instead of a single node or item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BackupError::Auth(_) | BackupError::Traversal { .. } | BackupError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
