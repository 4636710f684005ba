//! The port every social platform client implements.
//!
//! All operations return the platform's JSON reply on success. Failures are
//! normalized into [`PlatformError`] by each client's single request helper,
//! so callers never see raw HTTP bodies.

use crate::core::content::Platform;
use crate::core::scheduling::Schedule;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// Named steps of the multi-request upload protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadPhase {
    Start,
    Transfer,
    Finish,
    Stage,
    Attach,
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadPhase::Start => "start",
            UploadPhase::Transfer => "transfer",
            UploadPhase::Finish => "finish",
            UploadPhase::Stage => "stage",
            UploadPhase::Attach => "attach",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// 4xx with a structured error body.
    #[error("{platform} rejected the request ({status}): {message}")]
    Rejected {
        platform: Platform,
        status: u16,
        message: String,
    },
    /// Network failures, timeouts and 5xx replies.
    #[error("{platform} request failed: {message}")]
    Transport { platform: Platform, message: String },
    #[error("Upload {phase} phase failed: {source}")]
    Phase {
        phase: UploadPhase,
        #[source]
        source: Box<PlatformError>,
    },
    #[error("Media error: {0}")]
    Media(String),
    #[error("{platform} does not support {operation}")]
    Unsupported {
        platform: Platform,
        operation: &'static str,
    },
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    pub fn at_phase(self, phase: UploadPhase) -> Self {
        match self {
            already @ PlatformError::Phase { .. } => already,
            other => PlatformError::Phase {
                phase,
                source: Box::new(other),
            },
        }
    }

    /// Whether retrying the whole attempt could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PlatformError::Transport { .. } => true,
            PlatformError::Phase { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, PlatformError::Unsupported { .. })
    }

    /// Classifies a non-success HTTP reply.
    pub fn from_status(platform: Platform, status: u16, body: &str) -> Self {
        let message = error_message_from(status, body);
        if status >= 500 {
            PlatformError::Transport { platform, message }
        } else {
            PlatformError::Rejected {
                platform,
                status,
                message,
            }
        }
    }
}

pub type PlatformResult = Result<Value, PlatformError>;

/// Pulls `error.message` out of an error body, falling back to the raw text
/// and then to the status code.
pub fn error_message_from(status: u16, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let nested = json
            .get("error")
            .and_then(|error| error.get("message").or(Some(error)))
            .and_then(Value::as_str);
        if let Some(message) = nested.filter(|m| !m.trim().is_empty()) {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status)
    } else {
        trimmed.to_string()
    }
}

/// The post identity in a platform reply: `id`, else `video_id`, else `post_id`.
pub fn post_id_from(data: &Value) -> Option<String> {
    ["id", "video_id", "post_id"].iter().find_map(|key| match data.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// An image to publish: a downloaded file, or a public URL the platform fetches.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Local(PathBuf),
    Remote(String),
}

impl ImageSource {
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Local(path) => path.display().to_string(),
            ImageSource::Remote(url) => url.clone(),
        }
    }
}

/// Text and timing shared by every publish call.
#[derive(Debug, Clone, Default)]
pub struct PostContent {
    pub title: String,
    pub message: String,
    /// When set, the post must be created hidden and go live at this instant.
    pub schedule: Option<Schedule>,
}

/// Wire protocol for one platform account (a page or a channel).
#[async_trait]
pub trait PlatformPublisher: Send + Sync {
    fn platform(&self) -> Platform;

    async fn publish_status(&self, content: &PostContent) -> PlatformResult;

    async fn publish_image(&self, image: &ImageSource, content: &PostContent) -> PlatformResult;

    /// Two-phase: stage every image unpublished, then attach them to one post.
    async fn publish_album(&self, images: &[ImageSource], content: &PostContent)
        -> PlatformResult;

    async fn publish_video(&self, video: &Path, content: &PostContent) -> PlatformResult;

    async fn publish_reel(&self, video: &Path, content: &PostContent) -> PlatformResult;

    async fn update_metadata(
        &self,
        post_id: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> PlatformResult;

    async fn delete(&self, post_id: &str) -> PlatformResult;

    async fn get_details(&self, post_id: &str) -> PlatformResult;

    async fn set_thumbnail(&self, post_id: &str, image: &Path) -> PlatformResult;

    /// Reads the given fields of a post. Used by the status reconciler.
    async fn probe(&self, post_id: &str, fields: &str) -> PlatformResult;

    /// Makes a scheduled post live immediately.
    async fn publish_now(&self, post_id: &str) -> PlatformResult;
}

/// The uniform `{success, data|error}` reply shape.
#[derive(Debug, Clone, Serialize)]
pub struct OperationReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationReply {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl fmt::Display) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

impl<E: fmt::Display> From<Result<Value, E>> for OperationReply {
    fn from(result: Result<Value, E>) -> Self {
        match result {
            Ok(data) => OperationReply::ok(data),
            Err(e) => OperationReply::failed(e),
        }
    }
}
