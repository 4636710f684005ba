// HTTP routes.
// Each feature gets its own route file.

pub mod posts;

pub mod sheets;

pub mod tasks;

pub mod uploads;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;

use super::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/api/tasks", get(tasks::list_tasks))
        .route("/api/tasks/{task_id}", get(tasks::get_task))
        .route("/api/v2/post/publish", post(posts::publish))
        .route("/api/v2/post/reconcile", post(posts::reconcile))
        .route("/api/v2/post/details/{index}", get(posts::details))
        .route("/api/v2/post/update/{index}", put(posts::update))
        .route("/api/v2/post/delete/{index}", delete(posts::delete))
        .route("/api/v2/post/publish-now/{index}", post(posts::publish_now))
        .route("/api/v2/post/sync-thumbnail/{index}", post(posts::sync_thumbnail))
        .route(
            "/api/v2/sheets/{sheet}",
            get(sheets::list_rows).post(sheets::append_row),
        )
        .route(
            "/api/v2/sheets/{sheet}/{index}",
            put(sheets::update_row).delete(sheets::delete_row),
        )
        .route(
            "/api/upload",
            post(uploads::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
