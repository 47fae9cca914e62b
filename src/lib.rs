//! Talent Cache - read-through caching for the project backend
//!
//! An in-memory TTL cache with pattern and tag invalidation, a cached
//! project service over a pluggable data source, and an HTTP API over both.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod projects;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::CacheManager;
pub use config::Config;
pub use projects::ProjectService;
pub use tasks::spawn_cleanup_task;
