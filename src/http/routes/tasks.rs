// Task progress polling.

use axum::extract::{Path, State};
use axum::Json;

use crate::core::tasks::TaskProgress;
use crate::http::{ApiError, AppState};

pub async fn list_tasks(State(state): State<AppState>) -> Json<Vec<TaskProgress>> {
    Json(state.tasks.list())
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskProgress>, ApiError> {
    state
        .tasks
        .get(&task_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", task_id)))
}
