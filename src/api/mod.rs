//! API Module
//!
//! HTTP handlers and routing for the cache and project REST API.
//!
//! # Endpoints
//! - `GET /health` - Health check
//! - `GET /cache/stats`, `GET /cache/keys`, `DELETE /cache` - Cache diagnostics
//! - `GET|DELETE /cache/entries/:key`, `PUT /cache/entries` - Raw entries
//! - `POST /cache/invalidate` - Pattern invalidation
//! - `/projects/...` - Cached project reads and invalidating writes
//! - `GET /payments/queue`, `GET /analytics/:kind/:period` - Cached finance views

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
