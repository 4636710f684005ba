//! Progress tracking for long-running operations (publishes, uploads).
//!
//! Tasks are diagnostic state only: they live for the process lifetime
//! (bounded by the registry's eviction policy) and are never persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Processing,
    Success,
    Error,
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Error)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskProgress {
    pub id: String,
    pub status: TaskStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registry of task progress records, keyed by an opaque generated id.
pub trait TaskRegistry: Send + Sync {
    /// Creates a queued task and returns its id.
    fn create(&self, message: &str) -> String;
    fn get(&self, id: &str) -> Option<TaskProgress>;
    /// Updates a task. Unknown ids are ignored.
    fn update(&self, id: &str, status: TaskStatus, message: &str, result: Option<Value>);
    fn list(&self) -> Vec<TaskProgress>;
}

/// Where long-running operations report human-readable progress.
pub trait ProgressSink: Send + Sync {
    fn report(&self, message: &str);
}

/// Discards progress. Used when an operation runs outside any task.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _message: &str) {}
}

/// A single task inside a registry.
#[derive(Clone)]
pub struct TaskHandle {
    registry: Arc<dyn TaskRegistry>,
    id: String,
}

impl TaskHandle {
    pub fn new(registry: Arc<dyn TaskRegistry>, id: impl Into<String>) -> Self {
        Self {
            registry,
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn succeed(&self, message: &str, result: Option<Value>) {
        self.registry
            .update(&self.id, TaskStatus::Success, message, result);
    }

    pub fn fail(&self, message: &str) {
        self.registry
            .update(&self.id, TaskStatus::Error, message, None);
    }
}

impl ProgressSink for TaskHandle {
    fn report(&self, message: &str) {
        self.registry
            .update(&self.id, TaskStatus::Processing, message, None);
    }
}
