// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "google/mod.rs"]
pub mod google;

#[path = "facebook/graph_publisher.rs"]
pub mod facebook;

#[path = "youtube/youtube_publisher.rs"]
pub mod youtube;

#[path = "publishers/http_publishers.rs"]
pub mod publishers;

#[path = "accounts/token_directory.rs"]
pub mod accounts;

#[path = "tasks/in_memory_tasks.rs"]
pub mod tasks;
