use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::LOCATION;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::google_auth::AccessTokenSource;
use crate::core::media::{ByteStream, DriveError, DriveFile, DriveMetadata, DriveStore, NewFile};

const DRIVE_API: &str = "https://www.googleapis.com/drive/v3/files";
const DRIVE_UPLOAD_API: &str = "https://www.googleapis.com/upload/drive/v3/files";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Drive v3 REST client covering the calls the media pipeline needs.
pub struct GoogleDriveClient {
    client: Client,
    auth: Arc<dyn AccessTokenSource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFileMetadata {
    name: Option<String>,
    /// Drive reports sizes as decimal strings.
    size: Option<String>,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCreatedFile {
    id: String,
    web_view_link: Option<String>,
}

impl GoogleDriveClient {
    pub fn new(auth: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            client: Client::new(),
            auth,
        }
    }

    async fn bearer(&self) -> Result<String, DriveError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| DriveError::Auth(e.to_string()))?;
        Ok(format!("Bearer {}", token))
    }

    async fn check(id: &str, response: reqwest::Response) -> Result<reqwest::Response, DriveError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => DriveError::NotFound(id.to_string()),
            StatusCode::UNAUTHORIZED => DriveError::Auth(text),
            _ => DriveError::Api(format!("Drive returned {}: {}", status, text)),
        })
    }
}

fn view_link(id: &str) -> String {
    format!("https://drive.google.com/file/d/{}/view", id)
}

#[async_trait]
impl DriveStore for GoogleDriveClient {
    async fn metadata(&self, id: &str) -> Result<DriveMetadata, DriveError> {
        let response = self
            .client
            .get(format!("{}/{}", DRIVE_API, id))
            .query(&[("fields", "name,size,mimeType"), ("supportsAllDrives", "true")])
            .header("Authorization", self.bearer().await?)
            .send()
            .await
            .map_err(|e| DriveError::Api(e.to_string()))?;
        let api: ApiFileMetadata = Self::check(id, response)
            .await?
            .json()
            .await
            .map_err(|e| DriveError::Api(e.to_string()))?;

        Ok(DriveMetadata {
            name: api.name.unwrap_or_else(|| id.to_string()),
            size: api.size.and_then(|s| s.parse().ok()),
            mime_type: api.mime_type.unwrap_or_default(),
        })
    }

    async fn open_download(&self, id: &str) -> Result<ByteStream, DriveError> {
        let response = self
            .client
            .get(format!("{}/{}", DRIVE_API, id))
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .header("Authorization", self.bearer().await?)
            .send()
            .await
            .map_err(|e| DriveError::Api(e.to_string()))?;
        let response = Self::check(id, response).await?;

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| DriveError::Api(e.to_string())))
            .boxed())
    }

    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<String, DriveError> {
        let mut body = json!({ "name": name, "mimeType": FOLDER_MIME });
        if let Some(parent) = parent_id {
            body["parents"] = json!([parent]);
        }

        let response = self
            .client
            .post(DRIVE_API)
            .query(&[("fields", "id"), ("supportsAllDrives", "true")])
            .header("Authorization", self.bearer().await?)
            .json(&body)
            .send()
            .await
            .map_err(|e| DriveError::Api(e.to_string()))?;
        let created: ApiCreatedFile = Self::check(name, response)
            .await?
            .json()
            .await
            .map_err(|e| DriveError::Api(e.to_string()))?;

        tracing::info!(folder = %name, id = %created.id, "Drive folder created");
        Ok(created.id)
    }

    async fn create_file(&self, bytes: Bytes, file: NewFile) -> Result<DriveFile, DriveError> {
        let mut metadata = json!({ "name": file.name });
        if let Some(parent) = &file.parent_id {
            metadata["parents"] = json!([parent]);
        }

        // Resumable upload: open a session with the metadata, then PUT the bytes.
        let bearer = self.bearer().await?;
        let response = self
            .client
            .post(DRIVE_UPLOAD_API)
            .query(&[("uploadType", "resumable"), ("supportsAllDrives", "true")])
            .header("Authorization", &bearer)
            .header("X-Upload-Content-Type", &file.mime_type)
            .header("X-Upload-Content-Length", bytes.len().to_string())
            .json(&metadata)
            .send()
            .await
            .map_err(|e| DriveError::Api(e.to_string()))?;
        let response = Self::check(&file.name, response).await?;
        let session_url = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| DriveError::Api("upload session has no Location header".into()))?;

        let response = self
            .client
            .put(&session_url)
            .query(&[("fields", "id,webViewLink")])
            .header("Authorization", &bearer)
            .header("Content-Type", &file.mime_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| DriveError::Api(e.to_string()))?;
        let created: ApiCreatedFile = Self::check(&file.name, response)
            .await?
            .json()
            .await
            .map_err(|e| DriveError::Api(e.to_string()))?;

        tracing::debug!(file = %file.name, id = %created.id, "Drive file uploaded");
        Ok(DriveFile {
            link: created
                .web_view_link
                .unwrap_or_else(|| view_link(&created.id)),
            id: created.id,
        })
    }

    async fn delete(&self, id: &str) -> Result<bool, DriveError> {
        let response = self
            .client
            .delete(format!("{}/{}", DRIVE_API, id))
            .query(&[("supportsAllDrives", "true")])
            .header("Authorization", self.bearer().await?)
            .send()
            .await
            .map_err(|e| DriveError::Api(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::check(id, response).await?;
        tracing::info!(id = %id, "Drive object deleted");
        Ok(true)
    }
}
