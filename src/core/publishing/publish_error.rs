use super::platform_publisher::PlatformError;
use crate::core::accounts::CredentialError;
use crate::core::content::StoreError;
use crate::core::media::{DriveError, FetchError};

/// Failure of a publish attempt or a post management action.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Missing or unusable row fields. Retrying will not help.
    #[error("Validation error: {0}")]
    Validation(String),
    /// Download, credential or platform I/O failure. The attempt may be retried.
    #[error("Transient error: {0}")]
    Transient(String),
    /// The platform refused the request.
    #[error("{0}")]
    Rejected(PlatformError),
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),
}

impl From<PlatformError> for PublishError {
    fn from(e: PlatformError) -> Self {
        if e.is_transient() {
            PublishError::Transient(e.to_string())
        } else {
            PublishError::Rejected(e)
        }
    }
}

impl From<FetchError> for PublishError {
    fn from(e: FetchError) -> Self {
        PublishError::Transient(e.to_string())
    }
}

impl From<DriveError> for PublishError {
    fn from(e: DriveError) -> Self {
        PublishError::Transient(e.to_string())
    }
}

impl From<CredentialError> for PublishError {
    fn from(e: CredentialError) -> Self {
        PublishError::Transient(format!("Credential error: {}", e))
    }
}
