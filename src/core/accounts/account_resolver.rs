// Multi-account credential selection for YouTube channels.
//
// A channel row may belong to one of several connected Google accounts.
// `Youtube_Config` maps channels to account ids; anything that goes wrong
// while following that mapping falls back to the default credential.

use crate::core::content::{ChannelTarget, Records, YoutubeConfig};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("No credentials for account {0}")]
    UnknownAccount(String),
    #[error("Token refresh failed: {0}")]
    Refresh(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid credential file: {0}")]
    Invalid(String),
}

/// Source of OAuth access tokens for Google APIs.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn default_access_token(&self) -> Result<String, CredentialError>;
    async fn account_access_token(&self, account_id: &str) -> Result<String, CredentialError>;
}

/// Which credential a channel will publish with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialChoice {
    Account(String),
    Default,
}

pub struct AccountResolver {
    records: Records,
    credentials: Arc<dyn CredentialStore>,
}

impl AccountResolver {
    pub fn new(records: Records, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            records,
            credentials,
        }
    }

    /// Finds the account for a channel: by channel id first, then by
    /// case-insensitive channel name. Never fails.
    pub async fn choose(&self, channel: &ChannelTarget) -> CredentialChoice {
        let configs = match self.records.youtube_configs().await {
            Ok(configs) => configs,
            Err(e) => {
                tracing::warn!("Could not read channel config, using default account: {}", e);
                return CredentialChoice::Default;
            }
        };
        match match_account(&configs, channel) {
            Some(account_id) => CredentialChoice::Account(account_id),
            None => CredentialChoice::Default,
        }
    }

    /// Access token for publishing to `channel`.
    ///
    /// Per-account failures degrade to the default credential; only a failing
    /// default credential is reported as an error.
    pub async fn access_token(&self, channel: &ChannelTarget) -> Result<String, CredentialError> {
        if let CredentialChoice::Account(account_id) = self.choose(channel).await {
            match self.credentials.account_access_token(&account_id).await {
                Ok(token) => {
                    tracing::debug!(account_id = %account_id, channel_id = %channel.id, "Using account credentials");
                    return Ok(token);
                }
                Err(e) => tracing::warn!(
                    account_id = %account_id,
                    "Account credentials unavailable, using default: {}",
                    e
                ),
            }
        }
        self.credentials.default_access_token().await
    }

    pub async fn default_access_token(&self) -> Result<String, CredentialError> {
        self.credentials.default_access_token().await
    }
}

fn match_account(configs: &[YoutubeConfig], channel: &ChannelTarget) -> Option<String> {
    let usable = |config: &&YoutubeConfig| !config.account_id.trim().is_empty();
    let channel_id = channel.id.trim();
    let channel_name = channel.name.trim();

    let by_id = configs
        .iter()
        .filter(usable)
        .find(|config| !channel_id.is_empty() && config.channel_id.trim() == channel_id);
    let by_name = || {
        configs.iter().filter(usable).find(|config| {
            !channel_name.is_empty() && config.channel_name.trim().eq_ignore_ascii_case(channel_name)
        })
    };
    by_id
        .or_else(by_name)
        .map(|config| config.account_id.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::content::record_store::testing::MemoryRecordStore;
    use crate::core::content::Table;
    use std::sync::Arc;

    struct FakeCredentials {
        healthy_account: &'static str,
    }

    #[async_trait]
    impl CredentialStore for FakeCredentials {
        async fn default_access_token(&self) -> Result<String, CredentialError> {
            Ok("default-token".into())
        }

        async fn account_access_token(&self, account_id: &str) -> Result<String, CredentialError> {
            if account_id == self.healthy_account {
                Ok(format!("{}-token", account_id))
            } else {
                Err(CredentialError::Refresh("invalid_grant".into()))
            }
        }
    }

    fn config_row(name: &str, id: &str, account: &str) -> Vec<String> {
        vec![name.into(), id.into(), String::new(), account.into()]
    }

    fn resolver() -> AccountResolver {
        let store = MemoryRecordStore::with_rows(
            Table::YoutubeConfig,
            vec![
                config_row("Main Channel", "UC-main", "acc-main"),
                config_row("Side", "UC-side", "acc-broken"),
                config_row("Orphan", "UC-orphan", ""),
            ],
        );
        AccountResolver::new(
            Records::new(Arc::new(store)),
            Arc::new(FakeCredentials {
                healthy_account: "acc-main",
            }),
        )
    }

    fn channel(name: &str, id: &str) -> ChannelTarget {
        ChannelTarget {
            name: name.into(),
            id: id.into(),
            gmail: String::new(),
        }
    }

    #[tokio::test]
    async fn test_matches_by_id_then_name() {
        let resolver = resolver();
        assert_eq!(
            resolver.choose(&channel("", "UC-main")).await,
            CredentialChoice::Account("acc-main".into())
        );
        assert_eq!(
            resolver.choose(&channel("main channel", "UC-unknown")).await,
            CredentialChoice::Account("acc-main".into())
        );
        assert_eq!(
            resolver.choose(&channel("Orphan", "UC-orphan")).await,
            CredentialChoice::Default
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_default_credentials() {
        let resolver = resolver();
        assert_eq!(
            resolver.access_token(&channel("", "UC-main")).await.unwrap(),
            "acc-main-token"
        );
        assert_eq!(
            resolver.access_token(&channel("Side", "UC-side")).await.unwrap(),
            "default-token"
        );
        assert_eq!(
            resolver.access_token(&channel("Nobody", "")).await.unwrap(),
            "default-token"
        );
    }
}
