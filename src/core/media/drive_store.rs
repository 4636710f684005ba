use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Drive API error: {0}")]
    Api(String),
    #[error("Drive object not found: {0}")]
    NotFound(String),
    #[error("Drive authentication failed: {0}")]
    Auth(String),
}

/// Coarse media classification derived from a mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
    Other,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("video/") {
            MediaKind::Video
        } else if mime.starts_with("image/") {
            MediaKind::Image
        } else {
            MediaKind::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriveMetadata {
    pub name: String,
    /// Declared size in bytes. Google-native documents have none.
    pub size: Option<u64>,
    pub mime_type: String,
}

impl DriveMetadata {
    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime(&self.mime_type)
    }
}

/// A file created in the drive store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriveFile {
    pub id: String,
    pub link: String,
}

/// Metadata for a new drive file.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub mime_type: String,
    pub parent_id: Option<String>,
}

pub type ByteStream = BoxStream<'static, Result<Bytes, DriveError>>;

/// Cloud drive used as media source and sink.
#[async_trait]
pub trait DriveStore: Send + Sync {
    async fn metadata(&self, id: &str) -> Result<DriveMetadata, DriveError>;

    /// Opens a chunked download of the object's bytes.
    async fn open_download(&self, id: &str) -> Result<ByteStream, DriveError>;

    async fn create_folder(&self, name: &str, parent_id: Option<&str>)
        -> Result<String, DriveError>;

    async fn create_file(&self, bytes: Bytes, file: NewFile) -> Result<DriveFile, DriveError>;

    /// Deletes an object. `Ok(false)` means it did not exist.
    async fn delete(&self, id: &str) -> Result<bool, DriveError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use dashmap::DashMap;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory drive: objects are `(mime, bytes)` keyed by id.
    #[derive(Default)]
    pub struct MemoryDrive {
        pub objects: DashMap<String, (String, Vec<u8>)>,
        /// Ids whose download stream fails midway.
        pub broken: DashMap<String, ()>,
        pub folders: DashMap<String, (String, Option<String>)>,
        next_id: AtomicUsize,
    }

    impl MemoryDrive {
        pub fn insert(&self, id: &str, mime: &str, bytes: &[u8]) {
            self.objects
                .insert(id.to_string(), (mime.to_string(), bytes.to_vec()));
        }

        pub fn break_download(&self, id: &str) {
            self.broken.insert(id.to_string(), ());
        }

        fn mint(&self, prefix: &str) -> String {
            format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst))
        }
    }

    #[async_trait]
    impl DriveStore for MemoryDrive {
        async fn metadata(&self, id: &str) -> Result<DriveMetadata, DriveError> {
            let object = self
                .objects
                .get(id)
                .ok_or_else(|| DriveError::NotFound(id.to_string()))?;
            Ok(DriveMetadata {
                name: id.to_string(),
                size: Some(object.1.len() as u64),
                mime_type: object.0.clone(),
            })
        }

        async fn open_download(&self, id: &str) -> Result<ByteStream, DriveError> {
            let bytes = self
                .objects
                .get(id)
                .map(|object| object.1.clone())
                .ok_or_else(|| DriveError::NotFound(id.to_string()))?;
            if self.broken.contains_key(id) {
                let chunks = vec![
                    Ok(Bytes::from(bytes)),
                    Err(DriveError::Api("connection reset".into())),
                ];
                return Ok(Box::pin(stream::iter(chunks)));
            }
            let chunks: Vec<Result<Bytes, DriveError>> = bytes
                .chunks(4)
                .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
                .collect();
            Ok(Box::pin(stream::iter(chunks)))
        }

        async fn create_folder(
            &self,
            name: &str,
            parent_id: Option<&str>,
        ) -> Result<String, DriveError> {
            let id = self.mint("folder");
            self.folders.insert(
                id.clone(),
                (name.to_string(), parent_id.map(str::to_string)),
            );
            Ok(id)
        }

        async fn create_file(&self, bytes: Bytes, file: NewFile) -> Result<DriveFile, DriveError> {
            let id = self.mint("file");
            self.objects
                .insert(id.clone(), (file.mime_type, bytes.to_vec()));
            Ok(DriveFile {
                link: format!("https://drive.google.com/file/d/{}/view", id),
                id,
            })
        }

        async fn delete(&self, id: &str) -> Result<bool, DriveError> {
            Ok(self.objects.remove(id).is_some())
        }
    }
}
