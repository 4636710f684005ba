// Content domain models - the rows the publisher reads and writes.
//
// These are pure domain types with no Google or HTTP dependencies.
// The schema module turns them into positional cell arrays and back.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which social platform a table (and therefore a row) belongs to.
///
/// Decided once from the table schema, never re-derived from names at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Facebook,
    Youtube,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Facebook => "Facebook",
            Platform::Youtube => "YouTube",
        }
    }

    /// Public link for a post id issued by this platform.
    pub fn permalink(&self, post_id: &str) -> String {
        match self {
            Platform::Facebook => format!("https://facebook.com/{}", post_id),
            Platform::Youtube => format!("https://youtube.com/watch?v={}", post_id),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of post a content row turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostType {
    Status,
    Image,
    Album,
    Video,
    Reels,
}

impl PostType {
    /// Parses the post-type cell. Empty or unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "status" => Some(PostType::Status),
            "image" => Some(PostType::Image),
            "album" => Some(PostType::Album),
            "video" => Some(PostType::Video),
            "reels" | "reel" => Some(PostType::Reels),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Status => "Status",
            PostType::Image => "Image",
            PostType::Album => "Album",
            PostType::Video => "Video",
            PostType::Reels => "Reels",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row status values written back after a publish attempt.
pub mod row_status {
    pub const PUBLISHED: &str = "PUBLISHED";
    pub const SUCCESS: &str = "SUCCESS";
    pub const SCHEDULED: &str = "SCHEDULED";
}

/// A Facebook page a row publishes to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageTarget {
    pub name: String,
    pub id: String,
    pub access_token: String,
}

/// A YouTube channel a row publishes to. Credentials come from the account table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelTarget {
    pub name: String,
    pub id: String,
    pub gmail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentTarget {
    Page(PageTarget),
    Channel(ChannelTarget),
}

impl ContentTarget {
    pub fn platform(&self) -> Platform {
        match self {
            ContentTarget::Page(_) => Platform::Facebook,
            ContentTarget::Channel(_) => Platform::Youtube,
        }
    }
}

/// One unit of schedulable content from `Facebook_db` or `Youtube_db`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRow {
    pub stt: String,
    pub media_drive_id: String,
    /// Title shown on the platform.
    pub video_name: String,
    /// Primary media reference: a URL or a JSON array of URLs.
    pub video_url: String,
    pub content_type: String,
    /// Caption / message body sent with the post.
    pub hook: String,
    pub body: String,
    pub cta: String,
    pub contact: String,
    pub product_hashtags: String,
    pub brand_hashtags: String,
    pub thumbnail_url: String,
    pub target: ContentTarget,
    pub post_type: String,
    /// Local date-time string; empty means publish immediately.
    pub calendar: String,
    pub completion_time: String,
    pub post_link: String,
    pub post_id: String,
    pub status: String,
    pub script_action: String,
}

impl ContentRow {
    /// An empty row for the given target.
    #[cfg(test)]
    pub fn new(target: ContentTarget) -> Self {
        Self {
            stt: String::new(),
            media_drive_id: String::new(),
            video_name: String::new(),
            video_url: String::new(),
            content_type: String::new(),
            hook: String::new(),
            body: String::new(),
            cta: String::new(),
            contact: String::new(),
            product_hashtags: String::new(),
            brand_hashtags: String::new(),
            thumbnail_url: String::new(),
            target,
            post_type: String::new(),
            calendar: String::new(),
            completion_time: String::new(),
            post_link: String::new(),
            post_id: String::new(),
            status: String::new(),
            script_action: String::new(),
        }
    }

    pub fn platform(&self) -> Platform {
        self.target.platform()
    }
}

/// Status of a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HistoryStatus {
    Success,
    Scheduled,
    Other(String),
}

impl HistoryStatus {
    pub fn as_str(&self) -> &str {
        match self {
            HistoryStatus::Success => row_status::SUCCESS,
            HistoryStatus::Scheduled => row_status::SCHEDULED,
            HistoryStatus::Other(value) => value,
        }
    }
}

impl From<String> for HistoryStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            // Rows written before the status column existed count as published.
            "" | row_status::SUCCESS => HistoryStatus::Success,
            row_status::SCHEDULED => HistoryStatus::Scheduled,
            _ => HistoryStatus::Other(value),
        }
    }
}

impl From<HistoryStatus> for String {
    fn from(value: HistoryStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for HistoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only record of a successful publish or schedule in `Published_History`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub media_drive_id: String,
    pub name: String,
    pub content_type: String,
    pub page_name: String,
    pub page_id: String,
    pub access_token: String,
    pub facebook_post_id: String,
    pub channel_name: String,
    pub channel_id: String,
    pub gmail_channel: String,
    pub youtube_post_id: String,
    pub thumbnail: String,
    pub permalink: String,
    pub status: HistoryStatus,
}

impl HistoryEntry {
    /// Which platform owns the post. A Facebook post id wins if both are present.
    pub fn platform(&self) -> Option<Platform> {
        if !self.facebook_post_id.trim().is_empty() {
            Some(Platform::Facebook)
        } else if !self.youtube_post_id.trim().is_empty() {
            Some(Platform::Youtube)
        } else {
            None
        }
    }

    pub fn post_id(&self) -> Option<&str> {
        match self.platform()? {
            Platform::Facebook => Some(self.facebook_post_id.trim()),
            Platform::Youtube => Some(self.youtube_post_id.trim()),
        }
    }

    pub fn post_type(&self) -> Option<PostType> {
        PostType::parse(&self.content_type)
    }

    pub fn is_scheduled(&self) -> bool {
        self.status == HistoryStatus::Scheduled
    }

    pub fn page(&self) -> PageTarget {
        PageTarget {
            name: self.page_name.clone(),
            id: self.page_id.clone(),
            access_token: self.access_token.clone(),
        }
    }

    pub fn channel(&self) -> ChannelTarget {
        ChannelTarget {
            name: self.channel_name.clone(),
            id: self.channel_id.clone(),
            gmail: self.gmail_channel.clone(),
        }
    }
}

/// A page entry in `Facebook_Config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacebookConfig {
    pub page_name: String,
    pub page_id: String,
    pub access_token: String,
}

/// A channel entry in `Youtube_Config`, linking a channel to a connected Google account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YoutubeConfig {
    pub channel_name: String,
    pub channel_id: String,
    pub gmail_channel: String,
    pub account_id: String,
}
