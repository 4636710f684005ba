// Media library: pushes uploaded files into per-topic drive folders.

use crate::core::media::{DriveError, DriveStore, MediaKind, NewFile};
use crate::core::tasks::ProgressSink;
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Invalid upload: {0}")]
    Invalid(String),
    #[error(transparent)]
    Drive(#[from] DriveError),
}

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    /// Declared content type. Guessed from the file name when blank.
    pub mime_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn effective_mime(&self) -> String {
        if self.mime_type.trim().is_empty() {
            mime_guess::from_path(&self.name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        } else {
            self.mime_type.trim().to_string()
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub parent_id: String,
    pub folder_name: String,
    pub thumbnail: Option<UploadFile>,
    pub files: Vec<UploadFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UploadedLinks {
    pub image_folder_id: String,
    pub video_folder_id: String,
    pub videos: Vec<String>,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

pub struct MediaLibrary {
    drive: Arc<dyn DriveStore>,
}

impl MediaLibrary {
    pub fn new(drive: Arc<dyn DriveStore>) -> Self {
        Self { drive }
    }

    /// Creates `<folder>-image` and `<folder>-video` under the parent and
    /// uploads the thumbnail and files into them. Videos (by content type)
    /// go to the video folder, everything else to the image folder.
    pub async fn ingest(
        &self,
        request: UploadRequest,
        progress: &dyn ProgressSink,
    ) -> Result<UploadedLinks, LibraryError> {
        let parent_id = request.parent_id.trim();
        let folder_name = request.folder_name.trim();
        if parent_id.is_empty() {
            return Err(LibraryError::Invalid("parentId is required".into()));
        }
        if folder_name.is_empty() {
            return Err(LibraryError::Invalid("folderName is required".into()));
        }

        progress.report("Creating folders...");
        let image_folder_id = self
            .drive
            .create_folder(&format!("{}-image", folder_name), Some(parent_id))
            .await?;
        let video_folder_id = self
            .drive
            .create_folder(&format!("{}-video", folder_name), Some(parent_id))
            .await?;

        let mut links = UploadedLinks {
            image_folder_id,
            video_folder_id,
            ..Default::default()
        };

        if let Some(thumbnail) = request.thumbnail {
            progress.report("Uploading thumbnail...");
            let folder = links.image_folder_id.clone();
            links.thumbnail = Some(self.store(thumbnail, &folder).await?);
        }

        let total = request.files.len();
        for (i, file) in request.files.into_iter().enumerate() {
            progress.report(&format!("Uploading file {}/{}...", i + 1, total));
            let is_video = MediaKind::from_mime(&file.effective_mime()) == MediaKind::Video;
            if is_video {
                let folder = links.video_folder_id.clone();
                links.videos.push(self.store(file, &folder).await?);
            } else {
                let folder = links.image_folder_id.clone();
                links.images.push(self.store(file, &folder).await?);
            }
        }

        tracing::info!(
            folder = %folder_name,
            videos = links.videos.len(),
            images = links.images.len(),
            "Media uploaded to drive"
        );
        Ok(links)
    }

    /// Deletes a drive object. `Ok(false)` when it was already gone.
    pub async fn remove(&self, id: &str) -> Result<bool, LibraryError> {
        let removed = self.drive.delete(id).await?;
        if !removed {
            tracing::debug!(drive_id = %id, "Drive object already absent");
        }
        Ok(removed)
    }

    async fn store(&self, file: UploadFile, folder_id: &str) -> Result<String, LibraryError> {
        let mime_type = file.effective_mime();
        let created = self
            .drive
            .create_file(
                file.bytes,
                NewFile {
                    name: file.name,
                    mime_type,
                    parent_id: Some(folder_id.to_string()),
                },
            )
            .await?;
        Ok(created.link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::media::drive_store::testing::MemoryDrive;
    use crate::core::tasks::testing::RecordingSink;

    fn file(name: &str, mime: &str) -> UploadFile {
        UploadFile {
            name: name.into(),
            mime_type: mime.into(),
            bytes: Bytes::from_static(b"data"),
        }
    }

    #[tokio::test]
    async fn test_ingest_sorts_files_into_folders() {
        let drive = Arc::new(MemoryDrive::default());
        let library = MediaLibrary::new(drive.clone());
        let sink = RecordingSink::default();

        let links = library
            .ingest(
                UploadRequest {
                    parent_id: "root-folder".into(),
                    folder_name: "spring".into(),
                    thumbnail: Some(file("cover.jpg", "image/jpeg")),
                    files: vec![file("clip.mp4", "video/mp4"), file("a.png", "")],
                },
                &sink,
            )
            .await
            .unwrap();

        assert_eq!(links.videos.len(), 1);
        assert_eq!(links.images.len(), 1);
        assert!(links.thumbnail.is_some());

        let image_folder = drive.folders.get(&links.image_folder_id).unwrap().clone();
        assert_eq!(image_folder, ("spring-image".into(), Some("root-folder".into())));
        let video_folder = drive.folders.get(&links.video_folder_id).unwrap().clone();
        assert_eq!(video_folder.0, "spring-video");

        // Blank mime types are guessed from the name.
        let png = links.images[0].rsplit('/').nth(1).unwrap().to_string();
        assert_eq!(drive.objects.get(&png).unwrap().0, "image/png");

        assert_eq!(
            sink.messages(),
            vec![
                "Creating folders...",
                "Uploading thumbnail...",
                "Uploading file 1/2...",
                "Uploading file 2/2...",
            ]
        );
    }

    #[tokio::test]
    async fn test_ingest_requires_parent_and_name() {
        let library = MediaLibrary::new(Arc::new(MemoryDrive::default()));
        let request = UploadRequest {
            parent_id: " ".into(),
            folder_name: "x".into(),
            thumbnail: None,
            files: vec![],
        };
        assert!(matches!(
            library.ingest(request, &RecordingSink::default()).await,
            Err(LibraryError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_reports_absence() {
        let drive = Arc::new(MemoryDrive::default());
        drive.insert("abc", "image/png", b"x");
        let library = MediaLibrary::new(drive);
        assert!(library.remove("abc").await.unwrap());
        assert!(!library.remove("abc").await.unwrap());
    }
}
