use super::drive_store::{DriveError, DriveStore};
use crate::core::tasks::ProgressSink;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Drive error: {0}")]
    Drive(#[from] DriveError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Downloaded file {0} is empty")]
    Empty(String),
}

/// Downloads drive objects into local transient storage.
#[derive(Clone)]
pub struct MediaFetcher {
    drive: Arc<dyn DriveStore>,
}

impl MediaFetcher {
    pub fn new(drive: Arc<dyn DriveStore>) -> Self {
        Self { drive }
    }

    /// Streams `id` into `dest` and returns the number of bytes written.
    ///
    /// A zero-byte result is an error even when the transfer itself reported
    /// none. On any failure the partial file is removed.
    pub async fn fetch(
        &self,
        id: &str,
        dest: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<u64, FetchError> {
        let result = self.transfer(id, dest, progress).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        result
    }

    async fn transfer(
        &self,
        id: &str,
        dest: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<u64, FetchError> {
        let metadata = self.drive.metadata(id).await?;
        let total = metadata.size.filter(|size| *size > 0);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = self.drive.open_download(id).await?;

        let mut written: u64 = 0;
        let mut last_reported = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;

            if let Some(total) = total {
                let percent = (written * 100 / total).min(100);
                if percent >= last_reported + 10 || (percent == 100 && last_reported < 100) {
                    last_reported = percent;
                    progress.report(&format!("Downloading {}: {}%", metadata.name, percent));
                }
            }
        }
        file.flush().await?;
        drop(file);

        let on_disk = tokio::fs::metadata(dest).await?.len();
        if on_disk == 0 {
            return Err(FetchError::Empty(id.to_string()));
        }
        tracing::debug!(drive_id = id, bytes = on_disk, "Drive object downloaded");
        Ok(on_disk)
    }
}

/// A downloaded file that is deleted when the guard goes out of scope.
#[derive(Debug)]
pub struct TempMedia {
    path: PathBuf,
}

impl TempMedia {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempMedia {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed temp media"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), "Failed to remove temp media: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::media::drive_store::testing::MemoryDrive;
    use crate::core::tasks::testing::RecordingSink;

    #[tokio::test]
    async fn test_fetch_writes_file_and_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let drive = Arc::new(MemoryDrive::default());
        drive.insert("video-id", "video/mp4", b"0123456789abcdef");
        let fetcher = MediaFetcher::new(drive);
        let sink = RecordingSink::default();

        let dest = dir.path().join("nested").join("clip.mp4");
        let written = fetcher.fetch("video-id", &dest, &sink).await.unwrap();

        assert_eq!(written, 16);
        assert_eq!(std::fs::read(&dest).unwrap(), b"0123456789abcdef");
        let messages = sink.messages();
        assert!(messages.last().unwrap().ends_with("100%"));
    }

    #[tokio::test]
    async fn test_empty_object_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let drive = Arc::new(MemoryDrive::default());
        drive.insert("empty", "image/png", b"");
        let fetcher = MediaFetcher::new(drive);

        let dest = dir.path().join("empty.png");
        let err = fetcher
            .fetch("empty", &dest, &RecordingSink::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Empty(_)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_interrupted_download_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let drive = Arc::new(MemoryDrive::default());
        drive.insert("flaky", "video/mp4", b"partial");
        drive.break_download("flaky");
        let fetcher = MediaFetcher::new(drive);

        let dest = dir.path().join("flaky.mp4");
        assert!(fetcher
            .fetch("flaky", &dest, &RecordingSink::default())
            .await
            .is_err());
        assert!(!dest.exists());
    }

    #[test]
    fn test_temp_media_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tmp.bin");
        std::fs::write(&path, b"x").unwrap();
        {
            let _guard = TempMedia::new(path.clone());
        }
        assert!(!path.exists());
    }
}
