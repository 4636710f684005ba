// Multi-image album publishing as an explicit two-phase state machine.
//
// Stage: every image is uploaded unpublished, one at a time, with a fixed
// pause after each call (the platform throttles bursts). Failed images are
// skipped. Attach: one post is created with every staged id, in stage order.

use super::platform_publisher::{ImageSource, PlatformError, PostContent, UploadPhase};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Pause after each staging call.
pub const STAGE_DELAY: Duration = Duration::from_millis(1500);

/// The two album requests a platform must provide.
#[async_trait]
pub trait PhotoStager: Send + Sync {
    /// Uploads one image without publishing it and returns its staging id.
    async fn stage(&self, image: &ImageSource) -> Result<String, PlatformError>;

    /// Creates the post carrying every staged image.
    async fn attach(&self, staged_ids: &[String], content: &PostContent)
        -> Result<Value, PlatformError>;
}

#[derive(Debug)]
enum AlbumState {
    Staging { next: usize },
    Attaching,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlbumOutcome {
    pub staged_ids: Vec<String>,
    /// Images that failed to stage, with the reason.
    pub skipped: Vec<(String, String)>,
    pub response: Value,
}

impl AlbumOutcome {
    /// The attach reply, annotated with what was attached and skipped.
    pub fn into_reply(self) -> Value {
        let mut reply = match self.response {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("response".into(), other);
                map
            }
        };
        reply.insert("attached_media".into(), json!(self.staged_ids));
        if !self.skipped.is_empty() {
            let skipped: Vec<Value> = self
                .skipped
                .iter()
                .map(|(image, error)| json!({ "image": image, "error": error }))
                .collect();
            reply.insert("skipped".into(), Value::Array(skipped));
        }
        Value::Object(reply)
    }
}

pub struct AlbumUpload<'a> {
    stager: &'a dyn PhotoStager,
    delay: Duration,
}

impl<'a> AlbumUpload<'a> {
    pub fn new(stager: &'a dyn PhotoStager) -> Self {
        Self {
            stager,
            delay: STAGE_DELAY,
        }
    }

    pub async fn run(
        &self,
        images: &[ImageSource],
        content: &PostContent,
    ) -> Result<AlbumOutcome, PlatformError> {
        let mut staged_ids = Vec::new();
        let mut skipped = Vec::new();
        let mut state = AlbumState::Staging { next: 0 };

        loop {
            state = match state {
                AlbumState::Staging { next } if next < images.len() => {
                    let image = &images[next];
                    match self.stager.stage(image).await {
                        Ok(id) => {
                            tracing::debug!(staging_id = %id, "Album image staged");
                            staged_ids.push(id);
                        }
                        Err(e) => {
                            tracing::warn!(image = %image.describe(), "Skipping album image: {}", e);
                            skipped.push((image.describe(), e.to_string()));
                        }
                    }
                    tokio::time::sleep(self.delay).await;
                    AlbumState::Staging { next: next + 1 }
                }
                AlbumState::Staging { .. } => {
                    if staged_ids.is_empty() {
                        let reasons: Vec<String> =
                            skipped.iter().map(|(_, error)| error.clone()).collect();
                        return Err(PlatformError::Media(format!(
                            "no album image could be staged: {}",
                            reasons.join("; ")
                        ))
                        .at_phase(UploadPhase::Stage));
                    }
                    AlbumState::Attaching
                }
                AlbumState::Attaching => {
                    let response = self
                        .stager
                        .attach(&staged_ids, content)
                        .await
                        .map_err(|e| e.at_phase(UploadPhase::Attach))?;
                    return Ok(AlbumOutcome {
                        staged_ids,
                        skipped,
                        response,
                    });
                }
            };
        }
    }
}
