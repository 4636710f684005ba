// Three-phase video upload: open a session, send the bytes, finalize.
//
// A failure in any phase stops the sequence; later phases never run.

use super::platform_publisher::{PlatformError, PlatformResult, UploadPhase};
use async_trait::async_trait;
use serde_json::Value;

/// An upload session opened by the start phase.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadSession {
    /// Platform-issued id for the media being uploaded, when the start reply has one.
    pub media_id: Option<String>,
    /// Where the transfer phase sends the bytes.
    pub upload_url: String,
}

#[async_trait]
pub trait PhasedUpload: Send + Sync {
    async fn start(&self) -> Result<UploadSession, PlatformError>;

    async fn transfer(&self, session: &UploadSession) -> Result<Value, PlatformError>;

    async fn finish(&self, session: &UploadSession, transfer_reply: Value) -> PlatformResult;
}

pub async fn run_phased_upload(upload: &dyn PhasedUpload) -> PlatformResult {
    let session = upload
        .start()
        .await
        .map_err(|e| e.at_phase(UploadPhase::Start))?;
    tracing::debug!(media_id = ?session.media_id, "Upload session opened");

    let transferred = upload
        .transfer(&session)
        .await
        .map_err(|e| e.at_phase(UploadPhase::Transfer))?;

    upload
        .finish(&session, transferred)
        .await
        .map_err(|e| e.at_phase(UploadPhase::Finish))
}
