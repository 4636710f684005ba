// Per-account Google credentials stored as `<tokens_dir>/<account_id>.json`.
//
// Each file has the authorized-user shape of `token.json`. Files are loaded
// lazily and kept for the process lifetime, so access tokens are cached per
// account as well.

use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::accounts::{CredentialError, CredentialStore};
use crate::infra::google::{AccessTokenSource, AuthError, AuthorizedUserAuth};

pub struct TokenDirectory {
    dir: PathBuf,
    default: Arc<dyn AccessTokenSource>,
    accounts: DashMap<String, Arc<AuthorizedUserAuth>>,
}

impl TokenDirectory {
    pub fn new(dir: impl Into<PathBuf>, default: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            dir: dir.into(),
            default,
            accounts: DashMap::new(),
        }
    }

    fn token_path(&self, account_id: &str) -> Result<PathBuf, CredentialError> {
        // Account ids come from a spreadsheet cell; keep them inside the directory.
        let valid = !account_id.is_empty()
            && account_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
            && !account_id.contains("..");
        if !valid {
            return Err(CredentialError::UnknownAccount(account_id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", account_id)))
    }

    async fn account(&self, account_id: &str) -> Result<Arc<AuthorizedUserAuth>, CredentialError> {
        if let Some(auth) = self.accounts.get(account_id) {
            return Ok(auth.clone());
        }

        let path = self.token_path(account_id)?;
        if !Path::new(&path).exists() {
            return Err(CredentialError::UnknownAccount(account_id.to_string()));
        }
        let auth = Arc::new(
            AuthorizedUserAuth::from_file(&path.to_string_lossy())
                .await
                .map_err(to_credential_error)?,
        );
        self.accounts.insert(account_id.to_string(), auth.clone());
        tracing::info!(account = %account_id, "Loaded account credentials");
        Ok(auth)
    }
}

fn to_credential_error(e: AuthError) -> CredentialError {
    match e {
        AuthError::Io(io) => CredentialError::Io(io),
        AuthError::Invalid(msg) | AuthError::NotConfigured(msg) => CredentialError::Invalid(msg),
        AuthError::Exchange(msg) => CredentialError::Refresh(msg),
    }
}

#[async_trait]
impl CredentialStore for TokenDirectory {
    async fn default_access_token(&self) -> Result<String, CredentialError> {
        self.default
            .access_token()
            .await
            .map_err(to_credential_error)
    }

    async fn account_access_token(&self, account_id: &str) -> Result<String, CredentialError> {
        let auth = self.account(account_id).await?;
        auth.access_token().await.map_err(to_credential_error)
    }
}
