//! Service-account OAuth token manager with automatic refresh.
//!
//! Signs a JWT assertion with the service account's private key, exchanges
//! it at the token endpoint, caches the access token in-memory and refreshes
//! it five minutes before it expires.

use std::path::Path;

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sheets_backup_core::{BackupError, TokenProvider};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Google OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Read access to Drive plus write access to Cloud Storage.
pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive.readonly",
    "https://www.googleapis.com/auth/devstorage.read_write",
];

/// Lifetime requested for each signed assertion (seconds).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Fields of a service-account key file used for token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Parse a service-account key from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, BackupError> {
        let key: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| BackupError::Auth(format!("invalid service account JSON: {}", e)))?;

        if key.client_email.trim().is_empty() || key.private_key.trim().is_empty() {
            return Err(BackupError::Auth(
                "service account credentials are missing client_email or private_key".to_string(),
            ));
        }
        Ok(key)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BackupError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            BackupError::Auth(format!(
                "cannot read service account file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }
}

/// JWT claims for the service-account assertion.
#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Cached token with expiration.
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        chrono::Utc::now() >= self.expires_at - chrono::Duration::minutes(5)
    }
}

/// Issues and caches access tokens for one service account.
pub struct TokenManager {
    key: ServiceAccountKey,
    scopes: String,
    http: reqwest::Client,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            scopes: DEFAULT_SCOPES.join(" "),
            http: reqwest::Client::new(),
            cache: RwLock::new(None),
        }
    }

    pub fn with_scopes(mut self, scopes: &[&str]) -> Self {
        self.scopes = scopes.join(" ");
        self
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn get_valid_token(&self) -> anyhow::Result<String> {
        // 1. Check cache
        if let Some(cached) = self.cache.read().await.as_ref() {
            if !cached.is_expired() {
                debug!("Token cache hit for {}", self.key.client_email);
                return Ok(cached.access_token.clone());
            }
        }

        // 2. Refresh under the write lock so concurrent callers wait for one exchange
        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref() {
            if !cached.is_expired() {
                return Ok(cached.access_token.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let access_token = fresh.access_token.clone();
        *cache = Some(fresh);
        Ok(access_token)
    }

    /// Exchange a signed assertion for an access token.
    async fn fetch_token(&self) -> anyhow::Result<CachedToken> {
        let assertion = self.signed_assertion()?;

        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "token exchange failed for {}: {} {}",
                self.key.client_email,
                status,
                body
            );
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: i64,
        }

        let token_resp: TokenResponse = resp.json().await?;
        let expires_at = chrono::Utc::now() + chrono::Duration::seconds(token_resp.expires_in);

        info!(
            "Issued access token for {}, expires at {}",
            self.key.client_email,
            expires_at.to_rfc3339()
        );

        Ok(CachedToken {
            access_token: token_resp.access_token,
            expires_at,
        })
    }

    fn signed_assertion(&self) -> anyhow::Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: &self.scopes,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }
}

#[async_trait]
impl TokenProvider for TokenManager {
    async fn access_token(&self) -> Result<String, BackupError> {
        self.get_valid_token()
            .await
            .map_err(|e| BackupError::Auth(e.to_string()))
    }
}
