use serde::{Deserialize, Serialize};

use crate::error::BackupError;
use crate::layout::DestinationPrefix;

/// Default number of concurrent drive/storage requests.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 10;
/// Default number of shortcut hops followed (no transitive chains).
pub const DEFAULT_SHORTCUT_CHAIN_DEPTH: u32 = 1;

/// Settings for one backup job, fixed at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Drive folder the traversal starts from
    pub root_folder_id: String,
    /// Destination bucket
    pub bucket_name: String,
    /// Key prefix, plain or strftime template (`backups/%Y-%m-%d`)
    #[serde(default)]
    pub destination_prefix: String,
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
    #[serde(default = "default_shortcut_chain_depth")]
    pub shortcut_chain_depth: u32,
}

fn default_concurrency_limit() -> usize {
    DEFAULT_CONCURRENCY_LIMIT
}

fn default_shortcut_chain_depth() -> u32 {
    DEFAULT_SHORTCUT_CHAIN_DEPTH
}

impl BackupConfig {
    pub fn new(root_folder_id: impl Into<String>, bucket_name: impl Into<String>) -> Self {
        Self {
            root_folder_id: root_folder_id.into(),
            bucket_name: bucket_name.into(),
            destination_prefix: String::new(),
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            shortcut_chain_depth: DEFAULT_SHORTCUT_CHAIN_DEPTH,
        }
    }

    /// Check required fields and parse the destination prefix.
    pub fn validate(&self) -> Result<DestinationPrefix, BackupError> {
        if self.root_folder_id.trim().is_empty() {
            return Err(BackupError::Config("root_folder_id is required".to_string()));
        }
        if self.bucket_name.trim().is_empty() {
            return Err(BackupError::Config("bucket_name is required".to_string()));
        }
        if self.concurrency_limit == 0 {
            return Err(BackupError::Config(
                "concurrency_limit must be at least 1".to_string(),
            ));
        }
        DestinationPrefix::parse(&self.destination_prefix)
    }
}
