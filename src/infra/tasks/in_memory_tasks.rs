// In-memory task registry.
//
// Tasks only exist to let a caller poll a background publish or upload, so
// they are kept in a DashMap for the life of the process. Finished tasks
// whose last update is older than `max_age` are swept out whenever a new task
// is created. Queued and processing tasks are never evicted, so a long upload
// stays pollable until it reports an outcome.

use crate::core::tasks::{TaskProgress, TaskRegistry, TaskStatus};
use chrono::{Duration, Utc};
use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

pub struct InMemoryTaskRegistry {
    tasks: DashMap<String, TaskProgress>,
    max_age: Duration,
}

impl InMemoryTaskRegistry {
    pub fn new(max_age: std::time::Duration) -> Self {
        Self {
            tasks: DashMap::new(),
            max_age: Duration::from_std(max_age).unwrap_or_else(|_| Duration::days(1)),
        }
    }

    fn evict_expired(&self) {
        let cutoff = Utc::now() - self.max_age;
        let before = self.tasks.len();
        self.tasks
            .retain(|_, task| !task.status.is_finished() || task.updated_at > cutoff);
        let evicted = before.saturating_sub(self.tasks.len());
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted expired tasks");
        }
    }
}

impl TaskRegistry for InMemoryTaskRegistry {
    fn create(&self, message: &str) -> String {
        self.evict_expired();

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        self.tasks.insert(
            id.clone(),
            TaskProgress {
                id: id.clone(),
                status: TaskStatus::Queued,
                message: message.to_string(),
                result: None,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    fn get(&self, id: &str) -> Option<TaskProgress> {
        self.tasks.get(id).map(|task| task.clone())
    }

    fn update(&self, id: &str, status: TaskStatus, message: &str, result: Option<Value>) {
        match self.tasks.get_mut(id) {
            Some(mut task) => {
                task.status = status;
                task.message = message.to_string();
                if result.is_some() {
                    task.result = result;
                }
                task.updated_at = Utc::now();
            }
            None => tracing::debug!(task_id = %id, "Update for unknown task ignored"),
        }
    }

    fn list(&self) -> Vec<TaskProgress> {
        let mut tasks: Vec<TaskProgress> = self.tasks.iter().map(|t| t.value().clone()).collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tasks::{ProgressSink, TaskHandle};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_task_lifecycle() {
        let registry: Arc<dyn TaskRegistry> =
            Arc::new(InMemoryTaskRegistry::new(std::time::Duration::from_secs(60)));
        let id = registry.create("Publishing row 3");
        assert_eq!(registry.get(&id).unwrap().status, TaskStatus::Queued);

        let handle = TaskHandle::new(registry.clone(), id.clone());
        handle.report("Downloading clip: 50%");
        let task = registry.get(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Processing);
        assert_eq!(task.message, "Downloading clip: 50%");

        handle.succeed("Done", Some(json!({"post_id": "1_2"})));
        let task = registry.get(&id).unwrap();
        assert!(task.status.is_finished());
        assert_eq!(task.result, Some(json!({"post_id": "1_2"})));
    }

    #[test]
    fn test_unknown_task_update_is_ignored() {
        let registry = InMemoryTaskRegistry::new(std::time::Duration::from_secs(60));
        registry.update("missing", TaskStatus::Error, "boom", None);
        assert!(registry.get("missing").is_none());
        assert!(registry.list().is_empty());
    }

    fn age(registry: &InMemoryTaskRegistry, id: &str, by: Duration) {
        let mut task = registry.tasks.get_mut(id).unwrap();
        task.created_at -= by;
        task.updated_at -= by;
    }

    #[test]
    fn test_old_finished_tasks_are_evicted_on_create() {
        let registry = InMemoryTaskRegistry::new(std::time::Duration::from_secs(60));
        let old = registry.create("old");
        registry.update(&old, TaskStatus::Success, "Done", None);
        age(&registry, &old, Duration::hours(2));

        let fresh = registry.create("fresh");
        assert!(registry.get(&old).is_none());
        assert!(registry.get(&fresh).is_some());
    }

    #[test]
    fn test_long_running_tasks_survive_eviction() {
        let registry = InMemoryTaskRegistry::new(std::time::Duration::from_secs(60));
        let uploading = registry.create("Uploading");
        registry.update(&uploading, TaskStatus::Processing, "Uploading clip: 10%", None);
        age(&registry, &uploading, Duration::hours(2));
        let queued = registry.create("Queued");
        age(&registry, &queued, Duration::hours(2));
        let failed = registry.create("Failed");
        registry.update(&failed, TaskStatus::Error, "boom", None);
        age(&registry, &failed, Duration::hours(2));

        registry.create("trigger");
        assert_eq!(
            registry.get(&uploading).unwrap().status,
            TaskStatus::Processing
        );
        assert!(registry.get(&queued).is_some());
        assert!(registry.get(&failed).is_none());
    }

    #[test]
    fn test_recently_finished_old_task_is_kept() {
        let registry = InMemoryTaskRegistry::new(std::time::Duration::from_secs(60));
        let id = registry.create("Publishing");
        age(&registry, &id, Duration::hours(2));
        registry.update(&id, TaskStatus::Success, "Done", None);

        registry.create("trigger");
        assert!(registry.get(&id).is_some());
    }
}
