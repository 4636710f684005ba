//! Publish orchestration for a single content row.
//!
//! One attempt walks `Pending -> TypeResolved -> MediaAcquired ->
//! PlatformCalled` and ends `Published`, `Scheduled` or `Failed`. Nothing is
//! written to the record store until the platform has accepted the post, so
//! a failed attempt leaves the row and the history untouched.
//!
//! Steps inside one attempt run strictly in sequence. Separate attempts may
//! run concurrently; callers should not publish the same row index twice at
//! once since the record store offers no isolation.

use super::platform_publisher::{
    post_id_from, ImageSource, PlatformError, PlatformPublisher, PostContent,
};
use super::publish_error::PublishError;
use super::publisher_directory::PublisherDirectory;
use crate::core::content::{
    row_status, ContentRow, ContentTarget, HistoryEntry, HistoryStatus, Platform, PostType,
    Records, Table,
};
use crate::core::media::{
    json_list, looks_like_json_list, resolve_drive_id, DriveStore, MediaFetcher, MediaKind,
    TempMedia,
};
use crate::core::scheduling::ScheduleCalculator;
use crate::core::tasks::{NoProgress, ProgressSink, TaskHandle, TaskRegistry, TaskStatus};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptState {
    Pending,
    TypeResolved,
    MediaAcquired,
    PlatformCalled,
    Published,
    Scheduled,
    Failed,
}

/// A successful publish or schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishOutcome {
    pub post_id: String,
    pub permalink: String,
    pub post_type: PostType,
    pub state: AttemptState,
    /// ISO-8601 UTC go-live time when the post was scheduled.
    pub scheduled_for: Option<String>,
    /// Image links that could not be downloaded and were left out.
    pub skipped_media: Vec<String>,
}

/// `{success, post_id|error}` reply for callers outside the core.
#[derive(Debug, Clone, Serialize)]
pub struct PublishResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_media: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Result<PublishOutcome, PublishError>> for PublishResult {
    fn from(result: &Result<PublishOutcome, PublishError>) -> Self {
        match result {
            Ok(outcome) => PublishResult {
                success: true,
                post_id: Some(outcome.post_id.clone()),
                permalink: Some(outcome.permalink.clone()),
                scheduled_for: outcome.scheduled_for.clone(),
                skipped_media: outcome.skipped_media.clone(),
                error: None,
            },
            Err(e) => PublishResult {
                success: false,
                post_id: None,
                permalink: None,
                scheduled_for: None,
                skipped_media: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

/// Media held for the duration of one attempt. Temp files go away on drop.
enum AcquiredMedia {
    Nothing,
    Video(TempMedia),
    Images {
        sources: Vec<ImageSource>,
        _downloads: Vec<TempMedia>,
        skipped: Vec<String>,
    },
}

impl AcquiredMedia {
    fn skipped(&self) -> Vec<String> {
        match self {
            AcquiredMedia::Images { skipped, .. } => skipped.clone(),
            _ => Vec::new(),
        }
    }
}

struct Attempt<'a> {
    table: Table,
    index: usize,
    /// Unique prefix for this attempt's temp files.
    scope: String,
    state: AttemptState,
    progress: &'a dyn ProgressSink,
}

impl Attempt<'_> {
    fn advance(&mut self, next: AttemptState) {
        tracing::debug!(
            table = self.table.name(),
            row = self.index,
            from = ?self.state,
            to = ?next,
            "Publish attempt advanced"
        );
        self.state = next;
    }

    fn temp_path(&self, temp_dir: &std::path::Path, label: &str, ext: &str) -> PathBuf {
        temp_dir.join(format!("{}_{}.{}", self.scope, label, ext))
    }
}

pub struct PublishOrchestrator {
    records: Records,
    drive: Arc<dyn DriveStore>,
    fetcher: MediaFetcher,
    publishers: PublisherDirectory,
    calculator: ScheduleCalculator,
    tasks: Arc<dyn TaskRegistry>,
    temp_dir: PathBuf,
}

impl PublishOrchestrator {
    pub fn new(
        records: Records,
        drive: Arc<dyn DriveStore>,
        publishers: PublisherDirectory,
        calculator: ScheduleCalculator,
        tasks: Arc<dyn TaskRegistry>,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            records,
            fetcher: MediaFetcher::new(drive.clone()),
            drive,
            publishers,
            calculator,
            tasks,
            temp_dir,
        }
    }

    /// Queues a publish attempt as a background task and returns the task id.
    pub fn spawn_publish(self: &Arc<Self>, table: Table, index: usize) -> String {
        let task_id = self
            .tasks
            .create(&format!("Queued publish of {} row {}", table.name(), index));
        let orchestrator = Arc::clone(self);
        let id = task_id.clone();
        tokio::spawn(async move {
            orchestrator.publish_row(table, index, Some(&id)).await;
        });
        task_id
    }

    /// Publishes a row and reports through the task `task_id` when given.
    pub async fn publish_row(
        &self,
        table: Table,
        index: usize,
        task_id: Option<&str>,
    ) -> PublishResult {
        let Some(task_id) = task_id else {
            return PublishResult::from(&self.publish(table, index, &NoProgress).await);
        };

        let handle = TaskHandle::new(self.tasks.clone(), task_id);
        self.tasks.update(
            task_id,
            TaskStatus::Processing,
            "Publishing started",
            None,
        );
        let result = self.publish(table, index, &handle).await;
        let reply = PublishResult::from(&result);
        match &result {
            Ok(outcome) => {
                let mut message = match outcome.state {
                    AttemptState::Scheduled => format!(
                        "Scheduled post {} for {}",
                        outcome.post_id,
                        outcome.scheduled_for.as_deref().unwrap_or_default()
                    ),
                    _ => format!("Published post {}", outcome.post_id),
                };
                if !outcome.skipped_media.is_empty() {
                    message.push_str(&format!(
                        " ({} image(s) skipped: {})",
                        outcome.skipped_media.len(),
                        outcome.skipped_media.join(", ")
                    ));
                }
                handle.succeed(&message, serde_json::to_value(&reply).ok());
            }
            Err(e) => handle.fail(&e.to_string()),
        }
        reply
    }

    /// Runs one publish attempt for the row at `index` of a content table.
    pub async fn publish(
        &self,
        table: Table,
        index: usize,
        progress: &dyn ProgressSink,
    ) -> Result<PublishOutcome, PublishError> {
        let mut attempt = Attempt {
            table,
            index,
            scope: format!(
                "{}_{}_{}",
                table.name().to_ascii_lowercase(),
                index,
                uuid::Uuid::new_v4().simple()
            ),
            state: AttemptState::Pending,
            progress,
        };

        match self.run(&mut attempt).await {
            Ok(outcome) => {
                tracing::info!(
                    table = table.name(),
                    row = index,
                    post_id = %outcome.post_id,
                    state = ?outcome.state,
                    "Publish attempt finished"
                );
                Ok(outcome)
            }
            Err(e) => {
                let reached = attempt.state;
                attempt.advance(AttemptState::Failed);
                tracing::warn!(
                    table = table.name(),
                    row = index,
                    reached = ?reached,
                    "Publish attempt failed: {}",
                    e
                );
                Err(e)
            }
        }
    }

    async fn run(&self, attempt: &mut Attempt<'_>) -> Result<PublishOutcome, PublishError> {
        if !attempt.table.is_content() {
            return Err(PublishError::Validation(format!(
                "{} does not hold publishable content",
                attempt.table.name()
            )));
        }
        let mut row = self.records.content_row(attempt.table, attempt.index).await?;

        attempt.progress.report("Resolving post type");
        let post_type = self.resolve_type(&row).await?;
        attempt.advance(AttemptState::TypeResolved);

        let publisher = self.publishers.for_target(&row.target).await?;
        let content = PostContent {
            title: row.video_name.clone(),
            message: row.hook.clone(),
            schedule: self.calculator.schedule(&row.calendar),
        };

        let media = self.acquire(&row, post_type, attempt).await?;
        attempt.advance(AttemptState::MediaAcquired);

        attempt
            .progress
            .report(&format!("Publishing {} to {}", post_type, publisher.platform()));
        let data = self
            .dispatch(publisher.as_ref(), post_type, &media, &content, &row, attempt)
            .await?;
        attempt.advance(AttemptState::PlatformCalled);
        let skipped_media = media.skipped();
        drop(media);

        let post_id = post_id_from(&data).ok_or_else(|| {
            PublishError::from(PlatformError::InvalidResponse(format!(
                "no post id in reply: {}",
                data
            )))
        })?;
        let platform = row.platform();
        let permalink = platform.permalink(&post_id);
        let scheduled = content.schedule.is_some();

        attempt.progress.report("Saving results");
        let history = history_entry(&row, post_type, &post_id, &permalink, scheduled);
        if let Err(e) = self.records.append_history(history).await {
            tracing::error!(post_id = %post_id, "Post is live but history could not be written: {}", e);
            return Err(e.into());
        }

        row.status = match (scheduled, platform) {
            (true, _) => row_status::SCHEDULED,
            (false, Platform::Facebook) => row_status::PUBLISHED,
            (false, Platform::Youtube) => row_status::SUCCESS,
        }
        .to_string();
        row.post_type = post_type.as_str().to_string();
        row.post_id = post_id.clone();
        row.post_link = permalink.clone();
        row.completion_time = self.calculator.format_local(Utc::now());
        if let Err(e) = self
            .records
            .update_content_row(attempt.table, attempt.index, row)
            .await
        {
            tracing::error!(post_id = %post_id, "Post is live but the content row could not be updated: {}", e);
            return Err(e.into());
        }

        let state = if scheduled {
            AttemptState::Scheduled
        } else {
            AttemptState::Published
        };
        attempt.advance(state);
        Ok(PublishOutcome {
            post_id,
            permalink,
            post_type,
            state,
            scheduled_for: content.schedule.map(|s| s.iso_utc),
            skipped_media,
        })
    }

    /// Decides the post type once, before any download.
    async fn resolve_type(&self, row: &ContentRow) -> Result<PostType, PublishError> {
        if row.platform() == Platform::Youtube {
            return Ok(PostType::Video);
        }

        let raw = row.post_type.trim();
        let explicit = PostType::parse(raw);
        if !raw.is_empty() && explicit.is_none() {
            return Err(PublishError::Validation(format!(
                "Unsupported post type '{}'",
                raw
            )));
        }

        // The media field first, then the thumbnail field; a field that holds
        // no drive object (e.g. an external URL) does not stop the search.
        let may_infer = matches!(explicit, None | Some(PostType::Status));
        if may_infer {
            for candidate in [row.video_url.as_str(), row.thumbnail_url.as_str()] {
                if candidate.trim().is_empty() {
                    continue;
                }
                if let Some(inferred) = self.infer_type(candidate).await {
                    tracing::debug!(post_type = %inferred, "Inferred post type from media");
                    return Ok(inferred);
                }
            }
        }
        Ok(explicit.unwrap_or(PostType::Status))
    }

    async fn infer_type(&self, candidate: &str) -> Option<PostType> {
        let drive_id = resolve_drive_id(candidate)?;
        let metadata = match self.drive.metadata(&drive_id).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(drive_id = %drive_id, "Could not inspect media for type inference: {}", e);
                return None;
            }
        };
        match metadata.kind() {
            MediaKind::Video => Some(PostType::Video),
            MediaKind::Image if looks_like_json_list(candidate) => Some(PostType::Album),
            MediaKind::Image => Some(PostType::Image),
            MediaKind::Other => None,
        }
    }

    async fn acquire(
        &self,
        row: &ContentRow,
        post_type: PostType,
        attempt: &Attempt<'_>,
    ) -> Result<AcquiredMedia, PublishError> {
        match post_type {
            PostType::Status => Ok(AcquiredMedia::Nothing),
            PostType::Video | PostType::Reels => {
                let drive_id = resolve_drive_id(&row.video_url).ok_or_else(|| {
                    PublishError::Validation(
                        "Could not resolve a drive id from the video link".to_string(),
                    )
                })?;
                attempt.progress.report("Downloading video");
                let temp = TempMedia::new(attempt.temp_path(&self.temp_dir, "video", "mp4"));
                self.fetcher
                    .fetch(&drive_id, temp.path(), attempt.progress)
                    .await?;
                Ok(AcquiredMedia::Video(temp))
            }
            PostType::Image | PostType::Album => {
                let candidates = gather_image_candidates(row);
                let mut sources = Vec::new();
                let mut downloads = Vec::new();
                let mut skipped = Vec::new();

                for (n, url) in candidates.iter().enumerate() {
                    match resolve_drive_id(url) {
                        Some(drive_id) => {
                            attempt
                                .progress
                                .report(&format!("Downloading image {}/{}", n + 1, candidates.len()));
                            let temp = TempMedia::new(attempt.temp_path(
                                &self.temp_dir,
                                &format!("image_{}", n),
                                "jpg",
                            ));
                            match self
                                .fetcher
                                .fetch(&drive_id, temp.path(), attempt.progress)
                                .await
                            {
                                Ok(_) => {
                                    sources.push(ImageSource::Local(temp.path().to_path_buf()));
                                    downloads.push(temp);
                                }
                                Err(e) => {
                                    tracing::warn!(url = %url, "Dropping image that failed to download: {}", e);
                                    skipped.push(url.clone());
                                }
                            }
                        }
                        None if is_web_url(url) => sources.push(ImageSource::Remote(url.clone())),
                        None => {
                            tracing::warn!(url = %url, "Dropping image link that is neither a drive link nor a URL");
                            skipped.push(url.clone());
                        }
                    }
                }

                if sources.is_empty() {
                    return Err(PublishError::Validation(
                        "No usable images found for this post".to_string(),
                    ));
                }
                Ok(AcquiredMedia::Images {
                    sources,
                    _downloads: downloads,
                    skipped,
                })
            }
        }
    }

    async fn dispatch(
        &self,
        publisher: &dyn PlatformPublisher,
        post_type: PostType,
        media: &AcquiredMedia,
        content: &PostContent,
        row: &ContentRow,
        attempt: &Attempt<'_>,
    ) -> Result<Value, PublishError> {
        match (&row.target, media) {
            (ContentTarget::Channel(_), AcquiredMedia::Video(video)) => {
                let data = publisher.publish_video(video.path(), content).await?;
                if let Some(video_id) = post_id_from(&data) {
                    self.apply_thumbnail(publisher, &video_id, row, attempt).await;
                }
                Ok(data)
            }
            (ContentTarget::Channel(_), _) => Err(PublishError::Validation(
                "YouTube rows must reference a video".to_string(),
            )),
            (ContentTarget::Page(_), AcquiredMedia::Nothing) => {
                Ok(publisher.publish_status(content).await?)
            }
            (ContentTarget::Page(_), AcquiredMedia::Video(video)) => {
                let data = if post_type == PostType::Reels {
                    publisher.publish_reel(video.path(), content).await?
                } else {
                    publisher.publish_video(video.path(), content).await?
                };
                Ok(data)
            }
            (ContentTarget::Page(_), AcquiredMedia::Images { sources, .. }) => {
                if post_type == PostType::Album || sources.len() > 1 {
                    return Ok(publisher.publish_album(sources, content).await?);
                }
                let single = &sources[..1];
                match publisher.publish_image(&single[0], content).await {
                    Ok(data) => Ok(data),
                    Err(e) if e.is_unsupported() && matches!(single[0], ImageSource::Local(_)) => {
                        tracing::debug!("Single image upload unsupported, retrying as an album of one");
                        Ok(publisher.publish_album(single, content).await?)
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// Best effort: a thumbnail failure never fails the publish.
    async fn apply_thumbnail(
        &self,
        publisher: &dyn PlatformPublisher,
        video_id: &str,
        row: &ContentRow,
        attempt: &Attempt<'_>,
    ) {
        let Some(drive_id) = resolve_drive_id(&row.thumbnail_url) else {
            return;
        };
        attempt.progress.report("Uploading thumbnail");
        let temp = TempMedia::new(attempt.temp_path(&self.temp_dir, "thumbnail", "jpg"));
        if let Err(e) = self
            .fetcher
            .fetch(&drive_id, temp.path(), attempt.progress)
            .await
        {
            tracing::warn!(video_id, "Thumbnail download failed: {}", e);
            return;
        }
        if let Err(e) = publisher.set_thumbnail(video_id, temp.path()).await {
            tracing::warn!(video_id, "Thumbnail update failed: {}", e);
        }
    }
}

/// Image links for an Image/Album row, first tier that yields anything wins:
/// the video field as a JSON list, the thumbnail field as a JSON list, the
/// thumbnail field as one link, the video field as one link.
pub fn gather_image_candidates(row: &ContentRow) -> Vec<String> {
    if let Some(list) = json_list(&row.video_url).filter(|l| !l.is_empty()) {
        return list;
    }
    if let Some(list) = json_list(&row.thumbnail_url).filter(|l| !l.is_empty()) {
        return list;
    }
    let thumbnail = row.thumbnail_url.trim();
    if !thumbnail.is_empty() && !looks_like_json_list(thumbnail) {
        return vec![thumbnail.to_string()];
    }
    let video = row.video_url.trim();
    if !video.is_empty() && !looks_like_json_list(video) {
        return vec![video.to_string()];
    }
    Vec::new()
}

fn is_web_url(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    value.starts_with("http://") || value.starts_with("https://")
}

fn history_entry(
    row: &ContentRow,
    post_type: PostType,
    post_id: &str,
    permalink: &str,
    scheduled: bool,
) -> HistoryEntry {
    let media_drive_id = if row.media_drive_id.trim().is_empty() {
        resolve_drive_id(&row.video_url).unwrap_or_default()
    } else {
        row.media_drive_id.clone()
    };
    let mut entry = HistoryEntry {
        media_drive_id,
        name: row.video_name.clone(),
        content_type: post_type.as_str().to_string(),
        page_name: String::new(),
        page_id: String::new(),
        access_token: String::new(),
        facebook_post_id: String::new(),
        channel_name: String::new(),
        channel_id: String::new(),
        gmail_channel: String::new(),
        youtube_post_id: String::new(),
        thumbnail: row.thumbnail_url.clone(),
        permalink: permalink.to_string(),
        status: if scheduled {
            HistoryStatus::Scheduled
        } else {
            HistoryStatus::Success
        },
    };
    match &row.target {
        ContentTarget::Page(page) => {
            entry.page_name = page.name.clone();
            entry.page_id = page.id.clone();
            entry.access_token = page.access_token.clone();
            entry.facebook_post_id = post_id.to_string();
        }
        ContentTarget::Channel(channel) => {
            entry.channel_name = channel.name.clone();
            entry.channel_id = channel.id.clone();
            entry.gmail_channel = channel.gmail.clone();
            entry.youtube_post_id = post_id.to_string();
        }
    }
    entry
}
