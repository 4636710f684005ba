// =============================================================================
// GOOGLE OAUTH2 ACCESS TOKENS
// =============================================================================
//
// Two credential shapes are supported:
//
// 1. **Service account** (`GOOGLE_SERVICE_ACCOUNT_KEY` path or
//    `GOOGLE_SERVICE_ACCOUNT_JSON` content): a signed RS256 JWT is exchanged
//    for an access token. Works for Sheets and Drive when the spreadsheet and
//    folders are shared with the service account email. YouTube uploads need
//    a real channel owner, so they cannot use this.
//
// 2. **Authorized user** (`token.json`, the file written by Google's
//    installed-app OAuth flow): the stored refresh token is traded for a
//    fresh access token. This is the default for every API and the only
//    shape used for per-account YouTube credentials under `tokens/`.
//
// Both cache their access token and refresh it a minute before expiry.

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Google credentials not configured: {0}")]
    NotConfigured(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid credential file: {0}")]
    Invalid(String),
    #[error("Token exchange failed: {0}")]
    Exchange(String),
}

/// Anything that can hand out a bearer token for Google APIs.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

/// Access token cache shared by both credential shapes.
#[derive(Clone, Default)]
struct TokenCache {
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl TokenCache {
    /// The cached token, if it is valid for at least another minute.
    async fn fresh(&self) -> Option<String> {
        let cached = self.cached_token.read().await;
        cached
            .as_ref()
            .filter(|token| token.expires_at > SystemTime::now() + Duration::from_secs(60))
            .map(|token| token.token.clone())
    }

    async fn store(&self, token: &str, expires_in: u64) {
        let mut cached = self.cached_token.write().await;
        *cached = Some(CachedToken {
            token: token.to_string(),
            expires_at: SystemTime::now() + Duration::from_secs(expires_in),
        });
    }
}

async fn exchange(
    client: &Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, AuthError> {
    let response = client
        .post(token_uri)
        .form(form)
        .send()
        .await
        .map_err(|e| AuthError::Exchange(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(AuthError::Exchange(format!("{}: {}", status, text)));
    }

    response
        .json()
        .await
        .map_err(|e| AuthError::Exchange(e.to_string()))
}

// =============================================================================
// SERVICE ACCOUNT
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountCredentials {
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// JWT claims for the service account grant.
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: u64,
    exp: u64,
}

pub struct ServiceAccountAuth {
    credentials: ServiceAccountCredentials,
    scopes: String,
    client: Client,
    cache: TokenCache,
}

impl ServiceAccountAuth {
    pub fn from_json(json: &str, scopes: &[&str]) -> Result<Self, AuthError> {
        let credentials: ServiceAccountCredentials =
            serde_json::from_str(json).map_err(|e| AuthError::Invalid(e.to_string()))?;
        Ok(Self {
            credentials,
            scopes: scopes.join(" "),
            client: Client::new(),
            cache: TokenCache::default(),
        })
    }

    pub async fn from_file(path: &str, scopes: &[&str]) -> Result<Self, AuthError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content, scopes)
    }

    /// Reads `GOOGLE_SERVICE_ACCOUNT_KEY` (a path) or
    /// `GOOGLE_SERVICE_ACCOUNT_JSON` (the key itself).
    pub async fn from_env(scopes: &[&str]) -> Result<Self, AuthError> {
        if let Ok(path) = std::env::var("GOOGLE_SERVICE_ACCOUNT_KEY") {
            return Self::from_file(&path, scopes).await;
        }
        if let Ok(json) = std::env::var("GOOGLE_SERVICE_ACCOUNT_JSON") {
            return Self::from_json(&json, scopes);
        }
        Err(AuthError::NotConfigured(
            "neither GOOGLE_SERVICE_ACCOUNT_KEY nor GOOGLE_SERVICE_ACCOUNT_JSON is set".into(),
        ))
    }

    async fn fetch_new_token(&self) -> Result<TokenResponse, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AuthError::Exchange(e.to_string()))?
            .as_secs();

        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: self.scopes.clone(),
            aud: self.credentials.token_uri.clone(),
            iat: now,
            exp: now + 3600,
        };

        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| AuthError::Invalid(e.to_string()))?;
        let jwt = encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| AuthError::Invalid(e.to_string()))?;

        exchange(
            &self.client,
            &self.credentials.token_uri,
            &[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ],
        )
        .await
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountAuth {
    async fn access_token(&self) -> Result<String, AuthError> {
        if let Some(token) = self.cache.fresh().await {
            return Ok(token);
        }
        let fresh = self.fetch_new_token().await?;
        self.cache.store(&fresh.access_token, fresh.expires_in).await;
        Ok(fresh.access_token)
    }
}

// =============================================================================
// AUTHORIZED USER (token.json)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
struct AuthorizedUserCredentials {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

pub struct AuthorizedUserAuth {
    credentials: AuthorizedUserCredentials,
    client: Client,
    cache: TokenCache,
}

impl AuthorizedUserAuth {
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let credentials: AuthorizedUserCredentials =
            serde_json::from_str(json).map_err(|e| AuthError::Invalid(e.to_string()))?;
        if credentials.refresh_token.trim().is_empty() {
            return Err(AuthError::Invalid("refresh_token is empty".into()));
        }
        Ok(Self {
            credentials,
            client: Client::new(),
            cache: TokenCache::default(),
        })
    }

    pub async fn from_file(path: &str) -> Result<Self, AuthError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }
}

#[async_trait]
impl AccessTokenSource for AuthorizedUserAuth {
    async fn access_token(&self) -> Result<String, AuthError> {
        if let Some(token) = self.cache.fresh().await {
            return Ok(token);
        }
        let fresh = exchange(
            &self.client,
            &self.credentials.token_uri,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", &self.credentials.refresh_token),
                ("client_id", &self.credentials.client_id),
                ("client_secret", &self.credentials.client_secret),
            ],
        )
        .await?;
        self.cache.store(&fresh.access_token, fresh.expires_in).await;
        Ok(fresh.access_token)
    }
}

/// Service account when one is configured, otherwise the authorized-user
/// token file.
pub async fn google_auth_from_env(
    token_file: &str,
    scopes: &[&str],
) -> Result<Arc<dyn AccessTokenSource>, AuthError> {
    match ServiceAccountAuth::from_env(scopes).await {
        Ok(auth) => {
            tracing::info!("Using Google service account credentials");
            Ok(Arc::new(auth))
        }
        Err(AuthError::NotConfigured(_)) => {
            tracing::info!("Using Google user credentials from {}", token_file);
            Ok(Arc::new(AuthorizedUserAuth::from_file(token_file).await?))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorized_user_file_parses() {
        let json = r#"{
            "token": "ya29.stale",
            "refresh_token": "1//refresh",
            "client_id": "id.apps.googleusercontent.com",
            "client_secret": "secret",
            "scopes": ["https://www.googleapis.com/auth/youtube.upload"]
        }"#;
        let auth = AuthorizedUserAuth::from_json(json).unwrap();
        assert_eq!(auth.credentials.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_authorized_user_requires_refresh_token() {
        let json = r#"{"refresh_token": " ", "client_id": "a", "client_secret": "b"}"#;
        assert!(matches!(
            AuthorizedUserAuth::from_json(json),
            Err(AuthError::Invalid(_))
        ));
        assert!(matches!(
            AuthorizedUserAuth::from_json("{}"),
            Err(AuthError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_cache_refreshes_a_minute_early() {
        let cache = TokenCache::default();
        assert_eq!(cache.fresh().await, None);

        cache.store("long", 3600).await;
        assert_eq!(cache.fresh().await.as_deref(), Some("long"));

        cache.store("short", 30).await;
        assert_eq!(cache.fresh().await, None);
    }
}
