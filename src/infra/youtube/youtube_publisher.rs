// YouTube channel publishing through the Data API v3.
//
// Uploads use the resumable protocol as three phases: open a session with
// the video metadata, PUT the file, read the video resource from the reply.
// Only videos exist on YouTube; the post-style operations are unsupported.
//
// Requests are built by `request`, which attaches the bearer token, and
// sent by `execute`, which checks the status and normalizes error bodies.

use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::{json, Value};
use std::path::Path;

use crate::core::content::Platform;
use crate::core::publishing::{
    run_phased_upload, ImageSource, PhasedUpload, PlatformError, PlatformPublisher,
    PlatformResult, PostContent, UploadSession,
};

const YOUTUBE_API: &str = "https://www.googleapis.com/youtube/v3";
const YOUTUBE_UPLOAD_API: &str = "https://www.googleapis.com/upload/youtube/v3";
/// "People & Blogs".
const DEFAULT_CATEGORY: &str = "22";

/// Where a request goes.
#[derive(Debug, Clone, Copy)]
enum Endpoint<'a> {
    /// A path below the Data API root, e.g. `videos`.
    Api(&'a str),
    /// A path below the media upload root.
    Upload(&'a str),
    /// A resumable session URL returned by the upload start.
    Session(&'a str),
}

pub struct YoutubeDataPublisher {
    client: Client,
    access_token: String,
}

impl YoutubeDataPublisher {
    pub fn new(client: Client, access_token: impl Into<String>) -> Self {
        Self {
            client,
            access_token: access_token.into(),
        }
    }

    fn transport(e: impl std::fmt::Display) -> PlatformError {
        PlatformError::Transport {
            platform: Platform::Youtube,
            message: e.to_string(),
        }
    }

    fn unsupported(operation: &'static str) -> PlatformError {
        PlatformError::Unsupported {
            platform: Platform::Youtube,
            operation,
        }
    }

    /// An authorized request for `endpoint`.
    fn request(&self, method: Method, endpoint: Endpoint<'_>) -> RequestBuilder {
        let url = match endpoint {
            Endpoint::Api(path) => format!("{}/{}", YOUTUBE_API, path),
            Endpoint::Upload(path) => format!("{}/{}", YOUTUBE_UPLOAD_API, path),
            Endpoint::Session(url) => url.to_string(),
        };
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }

    /// Sends a request and fails on any non-success status.
    async fn execute(builder: RequestBuilder) -> Result<Response, PlatformError> {
        let response = builder.send().await.map_err(Self::transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.map_err(Self::transport)?;
        tracing::warn!(status = status.as_u16(), "YouTube API error");
        Err(PlatformError::from_status(
            Platform::Youtube,
            status.as_u16(),
            &text,
        ))
    }

    /// Sends a request and decodes the JSON reply. Empty bodies become `{}`.
    async fn send(builder: RequestBuilder) -> PlatformResult {
        let text = Self::execute(builder)
            .await?
            .text()
            .await
            .map_err(Self::transport)?;
        if text.trim().is_empty() {
            return Ok(json!({}));
        }
        serde_json::from_str(&text).map_err(|e| PlatformError::InvalidResponse(e.to_string()))
    }

    /// The first `items` entry of a `videos.list` call.
    async fn video(&self, video_id: &str, parts: &str) -> PlatformResult {
        let reply = Self::send(
            self.request(Method::GET, Endpoint::Api("videos"))
                .query(&[("part", parts), ("id", video_id)]),
        )
        .await?;
        first_item(&reply).cloned().ok_or_else(|| PlatformError::Rejected {
            platform: Platform::Youtube,
            status: 404,
            message: format!("Video {} not found", video_id),
        })
    }
}

fn first_item(reply: &Value) -> Option<&Value> {
    reply.get("items").and_then(|items| items.get(0))
}

/// `videos.insert` body. Scheduled uploads stay private until `publishAt`.
fn insert_body(content: &PostContent) -> Value {
    let mut status = json!({
        "privacyStatus": "public",
        "selfDeclaredMadeForKids": false,
    });
    if let Some(schedule) = &content.schedule {
        status["privacyStatus"] = json!("private");
        status["publishAt"] = json!(schedule.iso_utc);
    }
    json!({
        "snippet": {
            "title": content.title,
            "description": content.message,
            "tags": [],
            "categoryId": DEFAULT_CATEGORY,
        },
        "status": status,
    })
}

fn content_range(len: usize) -> String {
    if len == 0 {
        "bytes */0".to_string()
    } else {
        format!("bytes 0-{}/{}", len - 1, len)
    }
}

struct ResumableUpload<'a> {
    publisher: &'a YoutubeDataPublisher,
    video: &'a Path,
    content: &'a PostContent,
}

#[async_trait]
impl<'a> PhasedUpload for ResumableUpload<'a> {
    async fn start(&self) -> Result<UploadSession, PlatformError> {
        let size = tokio::fs::metadata(self.video)
            .await
            .map_err(|e| PlatformError::Media(format!("{}: {}", self.video.display(), e)))?
            .len();
        let mime = mime_guess::from_path(self.video).first_or_octet_stream();

        let response = YoutubeDataPublisher::execute(
            self.publisher
                .request(Method::POST, Endpoint::Upload("videos"))
                .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
                .header("X-Upload-Content-Length", size.to_string())
                .header("X-Upload-Content-Type", mime.essence_str())
                .json(&insert_body(self.content)),
        )
        .await?;

        let upload_url = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                PlatformError::InvalidResponse("upload session has no Location header".into())
            })?;
        Ok(UploadSession {
            media_id: None,
            upload_url,
        })
    }

    async fn transfer(&self, session: &UploadSession) -> Result<Value, PlatformError> {
        let bytes = tokio::fs::read(self.video)
            .await
            .map_err(|e| PlatformError::Media(format!("{}: {}", self.video.display(), e)))?;
        let range = content_range(bytes.len());
        YoutubeDataPublisher::send(
            self.publisher
                .request(Method::PUT, Endpoint::Session(&session.upload_url))
                .header("Content-Range", range)
                .body(bytes),
        )
        .await
    }

    async fn finish(&self, _session: &UploadSession, transfer_reply: Value) -> PlatformResult {
        match transfer_reply.get("id").and_then(Value::as_str) {
            Some(id) => {
                tracing::info!(video_id = %id, "YouTube upload complete");
                Ok(transfer_reply)
            }
            None => Err(PlatformError::InvalidResponse(
                "upload reply carries no video id".into(),
            )),
        }
    }
}

#[async_trait]
impl PlatformPublisher for YoutubeDataPublisher {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    async fn publish_status(&self, _content: &PostContent) -> PlatformResult {
        Err(Self::unsupported("status posts"))
    }

    async fn publish_image(&self, _image: &ImageSource, _content: &PostContent) -> PlatformResult {
        Err(Self::unsupported("image posts"))
    }

    async fn publish_album(&self, _images: &[ImageSource], _content: &PostContent) -> PlatformResult {
        Err(Self::unsupported("albums"))
    }

    async fn publish_video(&self, video: &Path, content: &PostContent) -> PlatformResult {
        let upload = ResumableUpload {
            publisher: self,
            video,
            content,
        };
        run_phased_upload(&upload).await
    }

    async fn publish_reel(&self, _video: &Path, _content: &PostContent) -> PlatformResult {
        Err(Self::unsupported("reels"))
    }

    /// YouTube replaces the whole snippet on update, so the current one is
    /// read first and only the given fields change.
    async fn update_metadata(
        &self,
        post_id: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> PlatformResult {
        let video = self.video(post_id, "snippet,status").await?;
        let mut snippet = video.get("snippet").cloned().unwrap_or_else(|| json!({}));
        if let Some(title) = title {
            snippet["title"] = json!(title);
        }
        if let Some(description) = description {
            snippet["description"] = json!(description);
        }

        Self::send(
            self.request(Method::PUT, Endpoint::Api("videos"))
                .query(&[("part", "snippet")])
                .json(&json!({ "id": post_id, "snippet": snippet })),
        )
        .await
    }

    async fn delete(&self, post_id: &str) -> PlatformResult {
        Self::send(self.request(Method::DELETE, Endpoint::Api("videos")).query(&[("id", post_id)])).await?;
        Ok(json!({ "deleted": post_id }))
    }

    async fn get_details(&self, post_id: &str) -> PlatformResult {
        Self::send(
            self.request(Method::GET, Endpoint::Api("videos"))
                .query(&[("part", "snippet,status,statistics"), ("id", post_id)]),
        )
        .await
    }

    async fn set_thumbnail(&self, post_id: &str, image: &Path) -> PlatformResult {
        let bytes = tokio::fs::read(image)
            .await
            .map_err(|e| PlatformError::Media(format!("{}: {}", image.display(), e)))?;
        let mime = mime_guess::from_path(image).first_or_octet_stream();
        Self::send(
            self.request(Method::POST, Endpoint::Upload("thumbnails/set"))
                .query(&[("videoId", post_id)])
                .header("Content-Type", mime.essence_str())
                .body(bytes),
        )
        .await
    }

    async fn probe(&self, post_id: &str, fields: &str) -> PlatformResult {
        Self::send(
            self.request(Method::GET, Endpoint::Api("videos"))
                .query(&[("part", fields), ("id", post_id)]),
        )
        .await
    }

    async fn publish_now(&self, post_id: &str) -> PlatformResult {
        let video = self.video(post_id, "status").await?;
        let mut status = video.get("status").cloned().unwrap_or_else(|| json!({}));
        status["privacyStatus"] = json!("public");
        if let Value::Object(map) = &mut status {
            map.remove("publishAt");
        }

        Self::send(
            self.request(Method::PUT, Endpoint::Api("videos"))
                .query(&[("part", "status")])
                .json(&json!({ "id": post_id, "status": status })),
        )
        .await
    }
}
