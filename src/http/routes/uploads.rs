// Media upload into the drive library, run as a background task.

use axum::extract::{Multipart, State};
use axum::Json;
use serde_json::{json, Value};

use crate::core::library::{UploadFile, UploadRequest};
use crate::core::tasks::TaskHandle;
use crate::http::{ApiError, AppState};

/// Reads `parentId`, `folderName`, an optional `thumbnail` file and any
/// number of `files` parts.
async fn read_upload(mut multipart: Multipart) -> Result<UploadRequest, ApiError> {
    let mut request = UploadRequest {
        parent_id: String::new(),
        folder_name: String::new(),
        thumbnail: None,
        files: Vec::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "parentId" | "folderName" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                if name == "parentId" {
                    request.parent_id = text;
                } else {
                    request.folder_name = text;
                }
            }
            "thumbnail" | "files" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                if bytes.is_empty() {
                    continue;
                }
                let file = UploadFile {
                    name: file_name,
                    mime_type,
                    bytes,
                };
                if name == "thumbnail" {
                    request.thumbnail = Some(file);
                } else {
                    request.files.push(file);
                }
            }
            other => tracing::debug!(field = %other, "Ignoring upload field"),
        }
    }

    if request.parent_id.trim().is_empty() || request.folder_name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "parentId and folderName are required".into(),
        ));
    }
    Ok(request)
}

pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let request = read_upload(multipart).await?;
    let file_count = request.files.len();

    let task_id = state
        .tasks
        .create(&format!("Queued upload of {} file(s)", file_count));
    let handle = TaskHandle::new(state.tasks.clone(), task_id.clone());
    let library = state.library.clone();

    tokio::spawn(async move {
        match library.ingest(request, &handle).await {
            Ok(links) => handle.succeed("Upload complete", serde_json::to_value(&links).ok()),
            Err(e) => {
                tracing::error!(task_id = %handle.id(), "Upload failed: {}", e);
                handle.fail(&e.to_string());
            }
        }
    });

    tracing::info!(task_id = %task_id, files = file_count, "Upload queued");
    Ok(Json(json!({ "status": "queued", "task_id": task_id })))
}
