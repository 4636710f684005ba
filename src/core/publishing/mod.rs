// Publishing: the platform port, upload protocols, the orchestrator and
// post management.

pub mod album_upload;
pub mod orchestrator;
pub mod phased_upload;
pub mod platform_publisher;
pub mod post_management;
pub mod publish_error;
pub mod publisher_directory;

#[cfg(test)]
pub(crate) mod fake_publisher;

pub use album_upload::{AlbumUpload, PhotoStager};
pub use orchestrator::PublishOrchestrator;
pub use phased_upload::{run_phased_upload, PhasedUpload, UploadSession};
pub use platform_publisher::{
    ImageSource, OperationReply, PlatformError, PlatformPublisher, PlatformResult, PostContent,
};
pub use post_management::PostManager;
pub use publish_error::PublishError;
pub use publisher_directory::{PublisherDirectory, PublisherFactory};
