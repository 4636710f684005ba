// Publishing and post management routes.
//
// Post actions address a `Published_History` row by its 0-based index.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::content::Table;
use crate::core::publishing::OperationReply;
use crate::core::reconcile::SweepReport;
use crate::http::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub sheet_name: String,
    pub index: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Resolves a content table name from a request.
pub fn content_table(name: &str) -> Result<Table, ApiError> {
    let table = Table::from_name(name)?;
    if !table.is_content() {
        return Err(ApiError::BadRequest(format!(
            "{} is not a content table",
            table.name()
        )));
    }
    Ok(table)
}

pub async fn publish(
    State(state): State<AppState>,
    Json(request): Json<PublishRequest>,
) -> Result<Json<Value>, ApiError> {
    let table = content_table(&request.sheet_name)?;
    let task_id = state.orchestrator.spawn_publish(table, request.index);
    tracing::info!(task_id = %task_id, table = %table.name(), row = request.index, "Publish queued");
    Ok(Json(json!({ "status": "queued", "task_id": task_id })))
}

pub async fn reconcile(State(state): State<AppState>) -> Json<SweepReport> {
    Json(state.reconciler.reconcile_once().await)
}

pub async fn details(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<OperationReply>, ApiError> {
    let data = state.posts.details(index).await?;
    Ok(Json(OperationReply::ok(data)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<OperationReply>, ApiError> {
    let data = state
        .posts
        .update(index, request.title, request.description)
        .await?;
    Ok(Json(OperationReply::ok(data)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<OperationReply>, ApiError> {
    let data = state.posts.delete(index).await?;
    Ok(Json(OperationReply::ok(data)))
}

pub async fn publish_now(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<OperationReply>, ApiError> {
    let data = state.posts.publish_now(index).await?;
    Ok(Json(OperationReply::ok(data)))
}

pub async fn sync_thumbnail(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<OperationReply>, ApiError> {
    let thumbnail = state.posts.sync_thumbnail(index).await?;
    Ok(Json(OperationReply::ok(json!({ "thumbnail": thumbnail }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_content_tables_publish() {
        assert_eq!(content_table("facebook_db").unwrap(), Table::FacebookContent);
        assert!(matches!(
            content_table("Published_History"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(content_table("Nope"), Err(ApiError::BadRequest(_))));
    }
}
