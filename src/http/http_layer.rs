// HTTP layer - the JSON front door over the core services.
//
// Handlers only translate: parse the request, call a core service, shape
// the reply. Long-running work (publishing, uploads) is queued as a task
// and the handler returns the task id at once.

#[path = "api_error.rs"]
pub mod api_error;

#[path = "routes/route_catalog.rs"]
pub mod routes;

use std::sync::Arc;

use crate::core::content::Records;
use crate::core::library::MediaLibrary;
use crate::core::publishing::{PostManager, PublishOrchestrator};
use crate::core::reconcile::StatusReconciler;
use crate::core::tasks::TaskRegistry;

pub use api_error::ApiError;
pub use routes::build_router;

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub records: Records,
    pub orchestrator: Arc<PublishOrchestrator>,
    pub posts: Arc<PostManager>,
    pub reconciler: Arc<StatusReconciler>,
    pub library: Arc<MediaLibrary>,
    pub tasks: Arc<dyn TaskRegistry>,
    pub max_upload_bytes: usize,
}
