// Row CRUD over the backing tables, speaking column-keyed JSON objects.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::core::content::{schema_for, Table, TableRow};
use crate::core::media::resolve_drive_id;
use crate::http::{ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub delete_drive: bool,
}

/// Overlays the request's keys on the stored row so a partial update keeps
/// every other column.
fn merge_object(mut stored: Map<String, Value>, changes: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in changes {
        if stored.contains_key(&key) {
            stored.insert(key, value);
        }
    }
    stored
}

/// The drive object a content row points at, if it has one.
fn row_drive_id(row: &TableRow) -> Option<String> {
    match row {
        TableRow::Content(content) => resolve_drive_id(&content.media_drive_id)
            .or_else(|| resolve_drive_id(&content.video_url)),
        _ => None,
    }
}

pub async fn list_rows(
    State(state): State<AppState>,
    Path(sheet): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let schema = schema_for(&sheet)?;
    let table = schema.table;
    let rows = state.records.get_all_rows(table).await?;

    let mut data = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let mut object = schema.to_object(row)?;
        object.insert("index".into(), json!(index));
        data.push(Value::Object(object));
    }
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn append_row(
    State(state): State<AppState>,
    Path(sheet): Path<String>,
    Json(object): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let schema = schema_for(&sheet)?;
    let table = schema.table;
    let row = schema.from_object(&object);
    state.records.append_row(table, &row).await?;
    tracing::info!(table = %table.name(), "Row appended");
    Ok(Json(json!({ "success": true })))
}

pub async fn update_row(
    State(state): State<AppState>,
    Path((sheet, index)): Path<(String, usize)>,
    Json(changes): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let schema = schema_for(&sheet)?;
    let table = schema.table;
    let stored = state.records.get_row(table, index).await?;

    let merged = merge_object(schema.to_object(&stored)?, changes);
    let row = schema.from_object(&merged);
    state.records.update_row(table, index, &row).await?;
    Ok(Json(json!({ "success": true, "data": merged })))
}

pub async fn delete_row(
    State(state): State<AppState>,
    Path((sheet, index)): Path<(String, usize)>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<Value>, ApiError> {
    let table = Table::from_name(&sheet)?;
    let row = state.records.get_row(table, index).await?;

    let mut drive_deleted = false;
    if params.delete_drive {
        if let Some(drive_id) = row_drive_id(&row) {
            // The row goes regardless; a drive failure is only reported.
            match state.library.remove(&drive_id).await {
                Ok(removed) => drive_deleted = removed,
                Err(e) => tracing::warn!(drive_id = %drive_id, "Could not delete drive object: {}", e),
            }
        }
    }

    state.records.delete_row(table, index).await?;
    tracing::info!(table = %table.name(), row = index, drive_deleted, "Row deleted");
    Ok(Json(json!({ "success": true, "drive_deleted": drive_deleted })))
}
