// Recording platform double shared by the publishing, reconcile and post
// management tests.

use super::platform_publisher::{
    ImageSource, PlatformError, PlatformPublisher, PlatformResult, PostContent,
};
use super::publisher_directory::PublisherFactory;
use crate::core::content::Platform;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Status {
        message: String,
        scheduled: Option<i64>,
    },
    Image {
        image: ImageSource,
        message: String,
    },
    Album {
        images: Vec<ImageSource>,
        scheduled: Option<i64>,
    },
    Video {
        path: PathBuf,
        title: String,
        existed: bool,
        publish_at: Option<String>,
    },
    Reel {
        path: PathBuf,
    },
    Update {
        post_id: String,
        title: Option<String>,
        description: Option<String>,
    },
    Delete(String),
    Details(String),
    Thumbnail {
        post_id: String,
        bytes: usize,
    },
    Probe {
        post_id: String,
        fields: String,
    },
    PublishNow(String),
}

pub struct FakePublisher {
    platform: Platform,
    pub calls: Mutex<Vec<Call>>,
    /// Replies to `probe`, keyed by `"<post_id>|<fields>"`. Missing keys reply `{}`.
    pub probes: DashMap<String, Result<Value, String>>,
    pub details: Mutex<Value>,
    pub image_unsupported: AtomicBool,
    pub fail_video: AtomicBool,
    pub fail_thumbnail: AtomicBool,
}

impl FakePublisher {
    pub fn new(platform: Platform) -> Arc<Self> {
        Arc::new(Self {
            platform,
            calls: Mutex::new(Vec::new()),
            probes: DashMap::new(),
            details: Mutex::new(json!({})),
            image_unsupported: AtomicBool::new(false),
            fail_video: AtomicBool::new(false),
            fail_thumbnail: AtomicBool::new(false),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_probe(&self, post_id: &str, fields: &str, reply: Result<Value, String>) {
        self.probes.insert(format!("{}|{}", post_id, fields), reply);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn rejected(&self, message: &str) -> PlatformError {
        PlatformError::Rejected {
            platform: self.platform,
            status: 400,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl PlatformPublisher for FakePublisher {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn publish_status(&self, content: &PostContent) -> PlatformResult {
        self.record(Call::Status {
            message: content.message.clone(),
            scheduled: content.schedule.as_ref().map(|s| s.epoch_seconds),
        });
        Ok(json!({"id": "page_status"}))
    }

    async fn publish_image(&self, image: &ImageSource, content: &PostContent) -> PlatformResult {
        if self.image_unsupported.load(Ordering::SeqCst) {
            return Err(PlatformError::Unsupported {
                platform: self.platform,
                operation: "single image upload",
            });
        }
        self.record(Call::Image {
            image: image.clone(),
            message: content.message.clone(),
        });
        Ok(json!({"id": "photo_1", "post_id": "page_photo"}))
    }

    async fn publish_album(
        &self,
        images: &[ImageSource],
        content: &PostContent,
    ) -> PlatformResult {
        self.record(Call::Album {
            images: images.to_vec(),
            scheduled: content.schedule.as_ref().map(|s| s.epoch_seconds),
        });
        Ok(json!({"id": "page_album"}))
    }

    async fn publish_video(&self, video: &Path, content: &PostContent) -> PlatformResult {
        self.record(Call::Video {
            path: video.to_path_buf(),
            title: content.title.clone(),
            existed: video.exists(),
            publish_at: content.schedule.as_ref().map(|s| s.iso_utc.clone()),
        });
        if self.fail_video.load(Ordering::SeqCst) {
            return Err(self.rejected("upload refused"));
        }
        Ok(json!({"id": "video_1"}))
    }

    async fn publish_reel(&self, video: &Path, _content: &PostContent) -> PlatformResult {
        self.record(Call::Reel {
            path: video.to_path_buf(),
        });
        Ok(json!({"id": "reel_1"}))
    }

    async fn update_metadata(
        &self,
        post_id: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> PlatformResult {
        self.record(Call::Update {
            post_id: post_id.to_string(),
            title: title.map(str::to_string),
            description: description.map(str::to_string),
        });
        Ok(json!({"success": true}))
    }

    async fn delete(&self, post_id: &str) -> PlatformResult {
        self.record(Call::Delete(post_id.to_string()));
        Ok(json!({"success": true}))
    }

    async fn get_details(&self, post_id: &str) -> PlatformResult {
        self.record(Call::Details(post_id.to_string()));
        Ok(self.details.lock().unwrap().clone())
    }

    async fn set_thumbnail(&self, post_id: &str, image: &Path) -> PlatformResult {
        let bytes = std::fs::read(image).map(|b| b.len()).unwrap_or(0);
        self.record(Call::Thumbnail {
            post_id: post_id.to_string(),
            bytes,
        });
        if self.fail_thumbnail.load(Ordering::SeqCst) {
            return Err(self.rejected("thumbnail refused"));
        }
        Ok(json!({"items": []}))
    }

    async fn probe(&self, post_id: &str, fields: &str) -> PlatformResult {
        self.record(Call::Probe {
            post_id: post_id.to_string(),
            fields: fields.to_string(),
        });
        match self.probes.get(&format!("{}|{}", post_id, fields)) {
            Some(reply) => match reply.value() {
                Ok(value) => Ok(value.clone()),
                Err(message) => Err(PlatformError::Transport {
                    platform: self.platform,
                    message: message.clone(),
                }),
            },
            None => Ok(json!({})),
        }
    }

    async fn publish_now(&self, post_id: &str) -> PlatformResult {
        self.record(Call::PublishNow(post_id.to_string()));
        Ok(json!({"success": true}))
    }
}

/// Hands out the same two fakes for every account and records the tokens used.
pub struct FakeFactory {
    pub facebook: Arc<FakePublisher>,
    pub youtube: Arc<FakePublisher>,
    pub tokens: Mutex<Vec<String>>,
}

impl FakeFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            facebook: FakePublisher::new(Platform::Facebook),
            youtube: FakePublisher::new(Platform::Youtube),
            tokens: Mutex::new(Vec::new()),
        })
    }
}

impl PublisherFactory for FakeFactory {
    fn facebook(&self, _page_id: &str, access_token: &str) -> Arc<dyn PlatformPublisher> {
        self.tokens.lock().unwrap().push(access_token.to_string());
        self.facebook.clone()
    }

    fn youtube(&self, access_token: &str) -> Arc<dyn PlatformPublisher> {
        self.tokens.lock().unwrap().push(access_token.to_string());
        self.youtube.clone()
    }
}
