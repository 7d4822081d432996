//! Google Drive implementation of the drive-side backup traits.
//!
//! Maps raw API errors onto the backup error taxonomy so the walker and the
//! pipeline can decide what to skip.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use sheets_backup_core::{
    BackupError, DirectoryLister, DocumentExporter, DriveEntry, ShortcutResolver,
};
use tracing::{debug, instrument};

use crate::gdrive::GDriveClient;

/// Lists, resolves and exports through the Drive API.
#[derive(Clone)]
pub struct GDriveBackend {
    client: Arc<GDriveClient>,
}

impl GDriveBackend {
    pub fn new(client: Arc<GDriveClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DirectoryLister for GDriveBackend {
    #[instrument(skip(self, token), level = "debug")]
    async fn list_children(
        &self,
        folder_id: &str,
        token: &str,
    ) -> Result<Vec<DriveEntry>, BackupError> {
        let files = self
            .client
            .list_children(token, folder_id)
            .await
            .map_err(|e| BackupError::List {
                folder_id: folder_id.to_string(),
                message: e.to_string(),
            })?;

        Ok(files.into_iter().map(DriveEntry::from).collect())
    }
}

#[async_trait]
impl ShortcutResolver for GDriveBackend {
    #[instrument(skip(self, token), level = "debug", fields(shortcut_id = %shortcut.id))]
    async fn resolve_shortcut(
        &self,
        shortcut: &DriveEntry,
        token: &str,
    ) -> Result<DriveEntry, BackupError> {
        let target_id =
            shortcut
                .shortcut_target_id
                .as_deref()
                .ok_or_else(|| BackupError::Resolve {
                    shortcut_id: shortcut.id.clone(),
                    message: "shortcut has no target".to_string(),
                })?;

        let file = self
            .client
            .get_file(token, target_id)
            .await
            .map_err(|e| BackupError::Resolve {
                shortcut_id: shortcut.id.clone(),
                message: e.to_string(),
            })?
            .ok_or_else(|| BackupError::Resolve {
                shortcut_id: shortcut.id.clone(),
                message: format!("target {} not found", target_id),
            })?;

        let entry = DriveEntry::from(file);
        debug!("Shortcut {} resolved to {:?} {}", shortcut.id, entry.kind, entry.id);
        Ok(entry)
    }
}

#[async_trait]
impl DocumentExporter for GDriveBackend {
    #[instrument(skip(self, token), level = "debug")]
    async fn export_spreadsheet(
        &self,
        source_id: &str,
        token: &str,
    ) -> Result<Bytes, BackupError> {
        self.client
            .export_xlsx(token, source_id)
            .await
            .map_err(|e| BackupError::Export {
                source_id: source_id.to_string(),
                message: e.to_string(),
            })
    }
}
