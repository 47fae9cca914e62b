//! Background Tasks Module
//!
//! - Expiry sweep: periodically drops expired cache entries

mod cleanup;

pub use cleanup::{spawn_cleanup_task, spawn_from_config};
