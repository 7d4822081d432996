use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BackupError;

/// Writes backup files to an object-storage bucket.
#[async_trait]
pub trait ObjectUploader: Send + Sync {
    /// Store `data` under `key`, overwriting any existing object.
    ///
    /// # Arguments
    /// * `bucket` - Destination bucket name
    /// * `key` - Object key (`{prefix}/{name}.xlsx`)
    /// * `data` - File content
    /// * `token` - Bearer token for token-authenticated backends
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        token: &str,
    ) -> Result<(), BackupError>;
}
