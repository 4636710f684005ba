// Actions on already published posts, addressed by history row index.

use super::publish_error::PublishError;
use super::publisher_directory::PublisherDirectory;
use crate::core::content::{HistoryStatus, Platform, Records, Table};
use serde_json::Value;

pub struct PostManager {
    records: Records,
    publishers: PublisherDirectory,
}

impl PostManager {
    pub fn new(records: Records, publishers: PublisherDirectory) -> Self {
        Self {
            records,
            publishers,
        }
    }

    pub async fn details(&self, index: usize) -> Result<Value, PublishError> {
        let entry = self.records.history_entry(index).await?;
        let (publisher, post_id) = self.publishers.for_history(&entry).await?;
        Ok(publisher.get_details(&post_id).await?)
    }

    /// Edits title and/or description on the platform. A new title is also
    /// written to the history row.
    pub async fn update(
        &self,
        index: usize,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<Value, PublishError> {
        let title = title.filter(|t| !t.trim().is_empty());
        let description = description.filter(|d| !d.trim().is_empty());
        if title.is_none() && description.is_none() {
            return Err(PublishError::Validation("Nothing to update".to_string()));
        }

        let mut entry = self.records.history_entry(index).await?;
        let (publisher, post_id) = self.publishers.for_history(&entry).await?;
        let data = publisher
            .update_metadata(&post_id, title.as_deref(), description.as_deref())
            .await?;

        if let Some(title) = title {
            entry.name = title;
            self.records.update_history(index, entry).await?;
        }
        Ok(data)
    }

    /// Deletes the post on the platform, then removes its history row.
    pub async fn delete(&self, index: usize) -> Result<Value, PublishError> {
        let entry = self.records.history_entry(index).await?;
        let (publisher, post_id) = self.publishers.for_history(&entry).await?;
        let data = publisher.delete(&post_id).await?;
        self.records.delete_row(Table::History, index).await?;
        tracing::info!(post_id = %post_id, row = index, "Deleted published post");
        Ok(data)
    }

    /// Makes a scheduled post live now and marks it SUCCESS.
    pub async fn publish_now(&self, index: usize) -> Result<Value, PublishError> {
        let mut entry = self.records.history_entry(index).await?;
        if !entry.is_scheduled() {
            return Err(PublishError::Validation(format!(
                "Post is {}, only scheduled posts can be published now",
                entry.status
            )));
        }
        let (publisher, post_id) = self.publishers.for_history(&entry).await?;
        let data = publisher.publish_now(&post_id).await?;

        entry.status = HistoryStatus::Success;
        self.records.update_history(index, entry).await?;
        tracing::info!(post_id = %post_id, row = index, "Scheduled post published early");
        Ok(data)
    }

    /// Copies the platform's current picture into the history row.
    pub async fn sync_thumbnail(&self, index: usize) -> Result<String, PublishError> {
        let mut entry = self.records.history_entry(index).await?;
        let (publisher, post_id) = self.publishers.for_history(&entry).await?;
        let details = publisher.get_details(&post_id).await?;

        let thumbnail = thumbnail_from_details(publisher.platform(), &details).ok_or_else(|| {
            PublishError::Validation(format!("Post {} has no thumbnail", post_id))
        })?;
        entry.thumbnail = thumbnail.clone();
        self.records.update_history(index, entry).await?;
        Ok(thumbnail)
    }
}

/// Picture URL from a detail reply: `full_picture` or `picture` for Facebook,
/// the largest `snippet.thumbnails` entry for YouTube.
pub fn thumbnail_from_details(platform: Platform, details: &Value) -> Option<String> {
    match platform {
        Platform::Facebook => ["full_picture", "picture"]
            .iter()
            .find_map(|key| details.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        Platform::Youtube => {
            let video = details
                .get("items")
                .and_then(|items| items.get(0))
                .unwrap_or(details);
            let thumbnails = video.get("snippet")?.get("thumbnails")?;
            ["maxres", "standard", "high", "medium", "default"]
                .iter()
                .find_map(|size| thumbnails.get(*size)?.get("url")?.as_str())
                .map(str::to_string)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::accounts::{AccountResolver, CredentialError, CredentialStore};
    use crate::core::content::record_store::testing::MemoryRecordStore;
    use crate::core::publishing::fake_publisher::{Call, FakeFactory};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct StaticToken;

    #[async_trait]
    impl CredentialStore for StaticToken {
        async fn default_access_token(&self) -> Result<String, CredentialError> {
            Ok("token".into())
        }

        async fn account_access_token(&self, _account_id: &str) -> Result<String, CredentialError> {
            Ok("token".into())
        }
    }

    fn facebook_history(post_id: &str, status: &str) -> Vec<String> {
        let mut cells = vec![String::new(); 14];
        cells[1] = "Launch".into();
        cells[2] = "Video".into();
        cells[4] = "1000".into();
        cells[5] = "page-token".into();
        cells[6] = post_id.into();
        cells[13] = status.into();
        cells
    }

    fn youtube_history(video_id: &str) -> Vec<String> {
        let mut cells = vec![String::new(); 14];
        cells[8] = "UC-main".into();
        cells[10] = video_id.into();
        cells
    }

    fn manager(rows: Vec<Vec<String>>) -> (PostManager, Arc<MemoryRecordStore>, Arc<FakeFactory>) {
        let store = Arc::new(MemoryRecordStore::with_rows(Table::History, rows));
        let records = Records::new(store.clone());
        let factory = FakeFactory::new();
        let accounts = Arc::new(AccountResolver::new(records.clone(), Arc::new(StaticToken)));
        let manager = PostManager::new(records, PublisherDirectory::new(factory.clone(), accounts));
        (manager, store, factory)
    }

    #[tokio::test]
    async fn test_update_mirrors_title_into_history() {
        let (manager, store, factory) = manager(vec![facebook_history("1_2", "")]);
        manager
            .update(0, Some("New title".into()), None)
            .await
            .unwrap();

        assert_eq!(
            factory.facebook.calls(),
            vec![Call::Update {
                post_id: "1_2".into(),
                title: Some("New title".into()),
                description: None
            }]
        );
        assert_eq!(store.rows(Table::History)[0][1], "New title");
        assert!(matches!(
            manager.update(0, Some("  ".into()), None).await,
            Err(PublishError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_history_row() {
        let (manager, store, factory) =
            manager(vec![facebook_history("1_2", ""), youtube_history("vid")]);
        manager.delete(1).await.unwrap();

        assert_eq!(factory.youtube.calls(), vec![Call::Delete("vid".into())]);
        assert_eq!(store.rows(Table::History).len(), 1);
    }

    #[tokio::test]
    async fn test_publish_now_only_for_scheduled_posts() {
        let (manager, store, factory) = manager(vec![
            facebook_history("1_2", "SCHEDULED"),
            facebook_history("3_4", "SUCCESS"),
        ]);
        manager.publish_now(0).await.unwrap();
        assert_eq!(factory.facebook.calls(), vec![Call::PublishNow("1_2".into())]);
        assert_eq!(store.rows(Table::History)[0][13], "SUCCESS");

        assert!(matches!(
            manager.publish_now(1).await,
            Err(PublishError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_sync_thumbnail() {
        let (manager, store, factory) = manager(vec![facebook_history("1_2", "")]);
        *factory.facebook.details.lock().unwrap() =
            json!({"full_picture": "https://scontent.example/pic.jpg"});

        let url = manager.sync_thumbnail(0).await.unwrap();
        assert_eq!(url, "https://scontent.example/pic.jpg");
        assert_eq!(store.rows(Table::History)[0][11], url);
    }

    #[tokio::test]
    async fn test_history_row_without_post_id() {
        let (manager, _store, _factory) = manager(vec![vec![String::new(); 14]]);
        assert!(matches!(
            manager.details(0).await,
            Err(PublishError::Validation(_))
        ));
    }

    #[test]
    fn test_youtube_thumbnail_prefers_largest() {
        let details = json!({"items": [{"snippet": {"thumbnails": {
            "default": {"url": "d"},
            "high": {"url": "h"}
        }}}]});
        assert_eq!(
            thumbnail_from_details(Platform::Youtube, &details).as_deref(),
            Some("h")
        );
        assert_eq!(thumbnail_from_details(Platform::Youtube, &json!({})), None);
    }
}
