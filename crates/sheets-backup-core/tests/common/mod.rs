//! In-memory drive and bucket used by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sheets_backup_core::{
    BackupError, CancellationToken, DirectoryLister, DocumentExporter, DriveEntry,
    ObjectUploader, ShortcutResolver, TokenProvider,
};

#[derive(Default)]
pub struct FakeDrive {
    folders: HashMap<String, Vec<DriveEntry>>,
    entries: HashMap<String, DriveEntry>,
    failing_folders: HashSet<String>,
    failing_exports: HashSet<String>,
    cancel_on_export: Option<(String, CancellationToken)>,
    list_delay: Option<Duration>,
    folder_delays: HashMap<String, Duration>,
    export_delays: HashMap<String, Duration>,
    pub list_calls: AtomicUsize,
    pub resolve_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    exports_in_flight: AtomicUsize,
    pub max_exports_in_flight: AtomicUsize,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a folder and its children; children become resolvable.
    pub fn folder(mut self, id: &str, children: Vec<DriveEntry>) -> Self {
        for child in &children {
            self.entries.insert(child.id.clone(), child.clone());
        }
        self.entries
            .entry(id.to_string())
            .or_insert_with(|| DriveEntry::folder(id, id.to_uppercase()));
        self.folders.insert(id.to_string(), children);
        self
    }

    /// Register an entry only reachable through shortcuts.
    pub fn entry(mut self, entry: DriveEntry) -> Self {
        self.entries.insert(entry.id.clone(), entry);
        self
    }

    pub fn fail_listing(mut self, folder_id: &str) -> Self {
        self.failing_folders.insert(folder_id.to_string());
        self
    }

    pub fn fail_export(mut self, source_id: &str) -> Self {
        self.failing_exports.insert(source_id.to_string());
        self
    }

    pub fn cancel_when_exporting(mut self, source_id: &str, cancel: CancellationToken) -> Self {
        self.cancel_on_export = Some((source_id.to_string(), cancel));
        self
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    /// Delay the listing of one folder, overriding `with_list_delay`.
    pub fn with_folder_delay(mut self, folder_id: &str, delay: Duration) -> Self {
        self.folder_delays.insert(folder_id.to_string(), delay);
        self
    }

    pub fn with_export_delay(mut self, source_id: &str, delay: Duration) -> Self {
        self.export_delays.insert(source_id.to_string(), delay);
        self
    }
}

#[async_trait]
impl DirectoryLister for FakeDrive {
    async fn list_children(
        &self,
        folder_id: &str,
        _token: &str,
    ) -> Result<Vec<DriveEntry>, BackupError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.folder_delays.get(folder_id).copied().or(self.list_delay) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_folders.contains(folder_id) {
            return Err(BackupError::List {
                folder_id: folder_id.to_string(),
                message: "403 permission denied".to_string(),
            });
        }
        self.folders
            .get(folder_id)
            .cloned()
            .ok_or_else(|| BackupError::List {
                folder_id: folder_id.to_string(),
                message: "404 not found".to_string(),
            })
    }
}

#[async_trait]
impl ShortcutResolver for FakeDrive {
    async fn resolve_shortcut(
        &self,
        shortcut: &DriveEntry,
        _token: &str,
    ) -> Result<DriveEntry, BackupError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let target_id = shortcut
            .shortcut_target_id
            .as_deref()
            .ok_or_else(|| BackupError::Resolve {
                shortcut_id: shortcut.id.clone(),
                message: "no target".to_string(),
            })?;
        self.entries
            .get(target_id)
            .cloned()
            .ok_or_else(|| BackupError::Resolve {
                shortcut_id: shortcut.id.clone(),
                message: format!("target {} not found", target_id),
            })
    }
}

#[async_trait]
impl DocumentExporter for FakeDrive {
    async fn export_spreadsheet(
        &self,
        source_id: &str,
        _token: &str,
    ) -> Result<Bytes, BackupError> {
        if let Some((id, cancel)) = &self.cancel_on_export {
            if id == source_id {
                cancel.cancel();
            }
        }

        let now = self.exports_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_exports_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.export_delays.get(source_id) {
            tokio::time::sleep(*delay).await;
        }
        self.exports_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_exports.contains(source_id) {
            return Err(BackupError::Export {
                source_id: source_id.to_string(),
                message: "export size limit exceeded".to_string(),
            });
        }
        Ok(Bytes::from(format!("xlsx:{}", source_id)))
    }
}

#[derive(Default)]
pub struct MemoryBucket {
    objects: Mutex<HashMap<(String, String), Bytes>>,
    failing_keys: HashSet<String>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_key(mut self, key: &str) -> Self {
        self.failing_keys.insert(key.to_string());
        self
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectUploader for MemoryBucket {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        _token: &str,
    ) -> Result<(), BackupError> {
        if self.failing_keys.contains(key) {
            return Err(BackupError::Upload {
                key: key.to_string(),
                message: "503 service unavailable".to_string(),
            });
        }
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }
}

pub struct FailingTokens;

#[async_trait]
impl TokenProvider for FailingTokens {
    async fn access_token(&self) -> Result<String, BackupError> {
        Err(BackupError::Auth("invalid_grant".to_string()))
    }
}
