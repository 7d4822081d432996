use async_trait::async_trait;

use crate::error::BackupError;

/// Supplies bearer tokens for the drive and storage APIs.
///
/// Implementations are expected to cache the token and refresh it
/// before it expires, so callers may ask for it before every request.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// # Errors
    /// `BackupError::Auth` when no token can be obtained.
    async fn access_token(&self) -> Result<String, BackupError>;
}

/// A pre-issued token that is never refreshed.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, BackupError> {
        if self.token.is_empty() {
            return Err(BackupError::Auth("empty access token".to_string()));
        }
        Ok(self.token.clone())
    }
}
