// Facebook Page publishing through the Graph API.
//
// Every call goes through `request`, which attaches the page token,
// checks the status and normalizes error bodies. Graph endpoints take the
// token as the `access_token` query parameter; the reel upload host takes
// it in an `OAuth` header. Reels use the three-phase `video_reels` flow;
// albums stage unpublished photos and attach them to one feed post.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{json, Value};
use std::path::Path;

use crate::core::content::Platform;
use crate::core::publishing::{
    run_phased_upload, AlbumUpload, ImageSource, PhasedUpload, PhotoStager, PlatformError,
    PlatformPublisher, PlatformResult, PostContent, UploadSession,
};

const GRAPH_HOST: &str = "https://graph.facebook.com";
const RUPLOAD_HOST: &str = "https://rupload.facebook.com/video-upload";
const DETAIL_FIELDS: &str = "message,full_picture,attachments,permalink_url,created_time";

/// Where a request goes.
enum Target<'a> {
    /// A Graph path below the configured API version, e.g. `{page}/feed`.
    Graph(&'a str),
    /// An absolute upload URL handed out by a reel start phase.
    Upload(&'a str),
}

enum Payload {
    Empty,
    Fields(Vec<(&'static str, String)>),
    Multipart(Form),
    /// Raw bytes with extra headers, for the reel byte transfer.
    Raw {
        headers: Vec<(&'static str, String)>,
        body: Vec<u8>,
    },
}

pub struct FacebookGraphPublisher {
    client: Client,
    graph_version: String,
    page_id: String,
    access_token: String,
}

impl FacebookGraphPublisher {
    pub fn new(
        client: Client,
        graph_version: impl Into<String>,
        page_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            graph_version: graph_version.into(),
            page_id: page_id.into(),
            access_token: access_token.into(),
        }
    }

    fn transport(e: impl std::fmt::Display) -> PlatformError {
        PlatformError::Transport {
            platform: Platform::Facebook,
            message: e.to_string(),
        }
    }

    /// Builds an authorized request without sending it.
    fn prepare(
        &self,
        method: Method,
        target: &Target<'_>,
        query: &[(&str, &str)],
        payload: Payload,
    ) -> RequestBuilder {
        let builder = match target {
            Target::Graph(endpoint) => self
                .client
                .request(
                    method,
                    format!("{}/{}/{}", GRAPH_HOST, self.graph_version, endpoint),
                )
                .query(&[("access_token", self.access_token.as_str())]),
            Target::Upload(url) => self
                .client
                .request(method, *url)
                .header("Authorization", format!("OAuth {}", self.access_token)),
        }
        .query(query);

        match payload {
            Payload::Empty => builder,
            Payload::Fields(fields) => builder.form(&fields),
            Payload::Multipart(form) => builder.multipart(form),
            Payload::Raw { headers, body } => headers
                .into_iter()
                .fold(builder, |builder, (name, value)| builder.header(name, value))
                .body(body),
        }
    }

    async fn request(
        &self,
        method: Method,
        target: Target<'_>,
        query: &[(&str, &str)],
        payload: Payload,
    ) -> PlatformResult {
        let endpoint = match &target {
            Target::Graph(endpoint) => *endpoint,
            Target::Upload(_) => "rupload",
        };
        let response = self
            .prepare(method, &target, query, payload)
            .send()
            .await
            .map_err(Self::transport)?;
        let status = response.status();
        let text = response.text().await.map_err(Self::transport)?;
        if !status.is_success() {
            tracing::warn!(endpoint = %endpoint, status = status.as_u16(), "Graph API error");
            return Err(PlatformError::from_status(
                Platform::Facebook,
                status.as_u16(),
                &text,
            ));
        }
        serde_json::from_str(&text).map_err(|e| PlatformError::InvalidResponse(e.to_string()))
    }

    async fn post_fields(&self, endpoint: &str, fields: Vec<(&'static str, String)>) -> PlatformResult {
        self.request(Method::POST, Target::Graph(endpoint), &[], Payload::Fields(fields))
            .await
    }

    async fn post_file(
        &self,
        endpoint: &str,
        fields: Vec<(&'static str, String)>,
        path: &Path,
    ) -> PlatformResult {
        let form = file_form(fields, path).await?;
        self.request(Method::POST, Target::Graph(endpoint), &[], Payload::Multipart(form))
            .await
    }

    fn edge(&self, edge: &str) -> String {
        format!("{}/{}", self.page_id, edge)
    }
}

/// Multipart form with the file under `source` plus plain text fields.
async fn file_form(fields: Vec<(&'static str, String)>, path: &Path) -> Result<Form, PlatformError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PlatformError::Media(format!("{}: {}", path.display(), e)))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime.essence_str())
        .map_err(|e| PlatformError::Media(e.to_string()))?;

    let mut form = Form::new();
    for (name, value) in fields {
        form = form.text(name, value);
    }
    Ok(form.part("source", part))
}

/// `published=false` plus the epoch when the post is scheduled.
fn schedule_fields(content: &PostContent) -> Vec<(&'static str, String)> {
    match &content.schedule {
        Some(schedule) => vec![
            ("published", "false".to_string()),
            ("scheduled_publish_time", schedule.epoch_seconds.to_string()),
        ],
        None => Vec::new(),
    }
}

fn reel_finish_fields(video_id: &str, content: &PostContent) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("upload_phase", "finish".to_string()),
        ("video_id", video_id.to_string()),
        ("description", content.message.clone()),
    ];
    match &content.schedule {
        Some(schedule) => {
            fields.push(("video_state", "SCHEDULED".to_string()));
            fields.push(("scheduled_publish_time", schedule.epoch_seconds.to_string()));
        }
        None => fields.push(("video_state", "PUBLISHED".to_string())),
    }
    fields
}

/// The `video_reels` start / rupload / finish sequence for one file.
struct ReelUpload<'a> {
    publisher: &'a FacebookGraphPublisher,
    video: &'a Path,
    content: &'a PostContent,
}

#[async_trait]
impl<'a> PhasedUpload for ReelUpload<'a> {
    async fn start(&self) -> Result<UploadSession, PlatformError> {
        let reply = self
            .publisher
            .post_fields(
                &self.publisher.edge("video_reels"),
                vec![("upload_phase", "start".to_string())],
            )
            .await?;
        let video_id = reply
            .get("video_id")
            .and_then(Value::as_str)
            .ok_or_else(|| PlatformError::InvalidResponse("reel start reply has no video_id".into()))?
            .to_string();
        let upload_url = reply
            .get("upload_url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!("{}/{}/{}", RUPLOAD_HOST, self.publisher.graph_version, video_id)
            });
        Ok(UploadSession {
            media_id: Some(video_id),
            upload_url,
        })
    }

    async fn transfer(&self, session: &UploadSession) -> Result<Value, PlatformError> {
        let bytes = tokio::fs::read(self.video)
            .await
            .map_err(|e| PlatformError::Media(format!("{}: {}", self.video.display(), e)))?;
        let size = bytes.len().to_string();
        self.publisher
            .request(
                Method::POST,
                Target::Upload(&session.upload_url),
                &[],
                Payload::Raw {
                    headers: vec![("offset", "0".to_string()), ("file_size", size)],
                    body: bytes,
                },
            )
            .await
    }

    async fn finish(&self, session: &UploadSession, _transfer_reply: Value) -> PlatformResult {
        let video_id = session.media_id.as_deref().unwrap_or_default();
        let mut reply = self
            .publisher
            .post_fields(video_id, reel_finish_fields(video_id, self.content))
            .await?;
        // The finish reply is only `{"success": true}`; the post is the video.
        if let Value::Object(map) = &mut reply {
            map.entry("id").or_insert_with(|| json!(video_id));
        }
        Ok(reply)
    }
}

#[async_trait]
impl PhotoStager for FacebookGraphPublisher {
    async fn stage(&self, image: &ImageSource) -> Result<String, PlatformError> {
        let fields = vec![("published", "false".to_string())];
        let reply = match image {
            ImageSource::Local(path) => self.post_file(&self.edge("photos"), fields, path).await?,
            ImageSource::Remote(url) => {
                let mut fields = fields;
                fields.push(("url", url.clone()));
                self.post_fields(&self.edge("photos"), fields).await?
            }
        };
        reply
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PlatformError::InvalidResponse("staged photo has no id".into()))
    }

    async fn attach(
        &self,
        staged_ids: &[String],
        content: &PostContent,
    ) -> Result<Value, PlatformError> {
        let media: Vec<Value> = staged_ids
            .iter()
            .map(|id| json!({ "media_fbid": id }))
            .collect();
        let mut fields = vec![
            ("message", content.message.clone()),
            ("attached_media", Value::Array(media).to_string()),
        ];
        fields.extend(schedule_fields(content));
        self.post_fields(&self.edge("feed"), fields).await
    }
}

#[async_trait]
impl PlatformPublisher for FacebookGraphPublisher {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn publish_status(&self, content: &PostContent) -> PlatformResult {
        let mut fields = vec![("message", content.message.clone())];
        fields.extend(schedule_fields(content));
        self.post_fields(&self.edge("feed"), fields).await
    }

    async fn publish_image(&self, image: &ImageSource, content: &PostContent) -> PlatformResult {
        let mut fields = vec![("caption", content.message.clone())];
        fields.extend(schedule_fields(content));
        match image {
            ImageSource::Local(path) => self.post_file(&self.edge("photos"), fields, path).await,
            ImageSource::Remote(url) => {
                fields.push(("url", url.clone()));
                self.post_fields(&self.edge("photos"), fields).await
            }
        }
    }

    async fn publish_album(&self, images: &[ImageSource], content: &PostContent) -> PlatformResult {
        let outcome = AlbumUpload::new(self).run(images, content).await?;
        Ok(outcome.into_reply())
    }

    async fn publish_video(&self, video: &Path, content: &PostContent) -> PlatformResult {
        let mut fields = vec![
            ("title", content.title.clone()),
            ("description", content.message.clone()),
        ];
        fields.extend(schedule_fields(content));
        self.post_file(&self.edge("videos"), fields, video).await
    }

    async fn publish_reel(&self, video: &Path, content: &PostContent) -> PlatformResult {
        let upload = ReelUpload {
            publisher: self,
            video,
            content,
        };
        run_phased_upload(&upload).await
    }

    async fn update_metadata(
        &self,
        post_id: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> PlatformResult {
        // Page posts carry a single message; a title is used when no description is given.
        let Some(message) = description.or(title) else {
            return Err(PlatformError::InvalidResponse("nothing to update".into()));
        };
        self.post_fields(post_id, vec![("message", message.to_string())])
            .await
    }

    async fn delete(&self, post_id: &str) -> PlatformResult {
        self.request(Method::DELETE, Target::Graph(post_id), &[], Payload::Empty)
            .await
    }

    async fn get_details(&self, post_id: &str) -> PlatformResult {
        self.probe(post_id, DETAIL_FIELDS).await
    }

    async fn set_thumbnail(&self, post_id: &str, image: &Path) -> PlatformResult {
        self.post_file(
            &format!("{}/thumbnails", post_id),
            vec![("is_preferred", "true".to_string())],
            image,
        )
        .await
    }

    async fn probe(&self, post_id: &str, fields: &str) -> PlatformResult {
        self.request(
            Method::GET,
            Target::Graph(post_id),
            &[("fields", fields)],
            Payload::Empty,
        )
            .await
    }

    async fn publish_now(&self, post_id: &str) -> PlatformResult {
        self.post_fields(post_id, vec![("is_published", "true".to_string())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scheduling::ScheduleCalculator;
    use crate::infra::publishers::testing::one_shot_server;
    use chrono::{TimeZone, Utc};

    fn scheduled_content() -> PostContent {
        let now = Utc.with_ymd_and_hms(2029, 12, 31, 0, 0, 0).unwrap();
        PostContent {
            title: "Launch".into(),
            message: "Hello".into(),
            schedule: ScheduleCalculator::default().schedule_at("2030-01-01 10:00", now),
        }
    }

    #[test]
    fn test_schedule_fields_hide_the_post() {
        assert!(schedule_fields(&PostContent::default()).is_empty());
        assert_eq!(
            schedule_fields(&scheduled_content()),
            vec![
                ("published", "false".to_string()),
                ("scheduled_publish_time", "1893492000".to_string()),
            ]
        );
    }

    #[test]
    fn test_reel_finish_state() {
        let immediate = reel_finish_fields("v1", &PostContent::default());
        assert!(immediate.contains(&("video_state", "PUBLISHED".to_string())));

        let scheduled = reel_finish_fields("v1", &scheduled_content());
        assert!(scheduled.contains(&("video_state", "SCHEDULED".to_string())));
        assert!(scheduled.contains(&("scheduled_publish_time", "1893492000".to_string())));
        assert!(scheduled.contains(&("description", "Hello".to_string())));
    }

    fn publisher() -> FacebookGraphPublisher {
        FacebookGraphPublisher::new(Client::new(), "v21.0", "1000", "page-token")
    }

    #[test]
    fn test_graph_requests_carry_the_token_as_query() {
        let request = publisher()
            .prepare(
                Method::GET,
                &Target::Graph("123_456"),
                &[("fields", "is_published")],
                Payload::Empty,
            )
            .build()
            .unwrap();
        let url = request.url().as_str();
        assert!(url.starts_with("https://graph.facebook.com/v21.0/123_456?"));
        assert!(url.contains("access_token=page-token"));
        assert!(url.contains("fields=is_published"));
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_upload_requests_carry_the_token_as_header() {
        let request = publisher()
            .prepare(
                Method::POST,
                &Target::Upload("https://rupload.facebook.com/video-upload/v21.0/77"),
                &[],
                Payload::Raw {
                    headers: vec![("offset", "0".to_string()), ("file_size", "3".to_string())],
                    body: b"abc".to_vec(),
                },
            )
            .build()
            .unwrap();
        assert_eq!(request.url().query(), None);
        assert_eq!(request.headers()["authorization"], "OAuth page-token");
        assert_eq!(request.headers()["file_size"], "3");
        assert_eq!(request.headers()["offset"], "0");
    }

    #[tokio::test]
    async fn test_reel_transfer_uses_the_shared_request_path() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("reel.mp4");
        std::fs::write(&video, b"12345").unwrap();
        let (base, head) = one_shot_server("200 OK", &[], r#"{"success":true}"#).await;

        let publisher = publisher();
        let content = PostContent::default();
        let upload = ReelUpload {
            publisher: &publisher,
            video: &video,
            content: &content,
        };
        let session = UploadSession {
            media_id: Some("77".into()),
            upload_url: format!("{}/video-upload/v21.0/77", base),
        };

        let reply = upload.transfer(&session).await.unwrap();
        assert_eq!(reply["success"], true);
        let head = head.await.unwrap();
        assert!(head.contains("authorization: oauth page-token"));
        assert!(head.contains("file_size: 5"));
        assert!(head.contains("offset: 0"));
    }

    #[tokio::test]
    async fn test_reel_transfer_errors_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("reel.mp4");
        std::fs::write(&video, b"12345").unwrap();
        let (base, _head) = one_shot_server(
            "400 Bad Request",
            &[],
            r#"{"error":{"message":"Invalid upload session"}}"#,
        )
        .await;

        let publisher = publisher();
        let content = PostContent::default();
        let upload = ReelUpload {
            publisher: &publisher,
            video: &video,
            content: &content,
        };
        let session = UploadSession {
            media_id: Some("77".into()),
            upload_url: format!("{}/video-upload/v21.0/77", base),
        };

        match upload.transfer(&session).await {
            Err(PlatformError::Rejected {
                status, message, ..
            }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid upload session");
            }
            other => panic!("expected a rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_a_media_error() {
        let result = file_form(Vec::new(), Path::new("/nonexistent/clip.mp4")).await;
        assert!(matches!(result, Err(PlatformError::Media(_))));
    }
}
