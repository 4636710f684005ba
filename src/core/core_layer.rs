// The core module contains all business logic.
// Each feature gets its own submodule; external services are reached
// only through the traits declared here.

#[path = "content/mod.rs"]
pub mod content;

#[path = "media/mod.rs"]
pub mod media;

#[path = "scheduling/schedule_calculator.rs"]
pub mod scheduling;

#[path = "tasks/task_registry.rs"]
pub mod tasks;

#[path = "accounts/account_resolver.rs"]
pub mod accounts;

#[path = "publishing/mod.rs"]
pub mod publishing;

#[path = "reconcile/status_reconciler.rs"]
pub mod reconcile;

#[path = "library/upload_service.rs"]
pub mod library;
