use super::platform_publisher::PlatformPublisher;
use super::publish_error::PublishError;
use crate::core::accounts::AccountResolver;
use crate::core::content::{ChannelTarget, ContentTarget, HistoryEntry, PageTarget, Platform};
use std::sync::Arc;

/// Builds platform clients for a given account.
pub trait PublisherFactory: Send + Sync {
    fn facebook(&self, page_id: &str, access_token: &str) -> Arc<dyn PlatformPublisher>;
    fn youtube(&self, access_token: &str) -> Arc<dyn PlatformPublisher>;
}

/// Picks the publisher for a row target or a history entry, validating the
/// identity fields and resolving YouTube credentials on the way.
#[derive(Clone)]
pub struct PublisherDirectory {
    factory: Arc<dyn PublisherFactory>,
    accounts: Arc<AccountResolver>,
}

impl PublisherDirectory {
    pub fn new(factory: Arc<dyn PublisherFactory>, accounts: Arc<AccountResolver>) -> Self {
        Self { factory, accounts }
    }

    pub async fn for_target(
        &self,
        target: &ContentTarget,
    ) -> Result<Arc<dyn PlatformPublisher>, PublishError> {
        match target {
            ContentTarget::Page(page) => self.for_page(page),
            ContentTarget::Channel(channel) => self.for_channel(channel).await,
        }
    }

    pub fn for_page(&self, page: &PageTarget) -> Result<Arc<dyn PlatformPublisher>, PublishError> {
        let page_id = page.id.trim();
        let token = page.access_token.trim();
        if page_id.is_empty() || token.is_empty() {
            return Err(PublishError::Validation(
                "Missing Facebook page id or access token".to_string(),
            ));
        }
        Ok(self.factory.facebook(page_id, token))
    }

    pub async fn for_channel(
        &self,
        channel: &ChannelTarget,
    ) -> Result<Arc<dyn PlatformPublisher>, PublishError> {
        if channel.id.trim().is_empty() {
            return Err(PublishError::Validation(
                "Missing YouTube channel id".to_string(),
            ));
        }
        let token = self.accounts.access_token(channel).await?;
        Ok(self.factory.youtube(&token))
    }

    /// Publisher and post id for a history entry.
    pub async fn for_history(
        &self,
        entry: &HistoryEntry,
    ) -> Result<(Arc<dyn PlatformPublisher>, String), PublishError> {
        let (Some(platform), Some(post_id)) = (entry.platform(), entry.post_id()) else {
            return Err(PublishError::Validation(
                "History entry has no post id".to_string(),
            ));
        };
        let post_id = post_id.to_string();
        let publisher = match platform {
            Platform::Facebook => self.for_page(&entry.page())?,
            Platform::Youtube => {
                // History rows may predate the channel id column; fall back to
                // the default account rather than refusing.
                let channel = entry.channel();
                let token = if channel.id.trim().is_empty() {
                    self.accounts.default_access_token().await?
                } else {
                    self.accounts.access_token(&channel).await?
                };
                self.factory.youtube(&token)
            }
        };
        Ok((publisher, post_id))
    }
}
