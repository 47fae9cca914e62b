//! Request and Response models for the HTTP API
//!
//! DTOs used to (de)serialize HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{
    BatchUpdateItem, BatchUpdateRequest, InvalidateRequest, KeysQuery, PaymentQueueQuery,
    SetRequest,
};
pub use responses::{
    EntryResponse, ErrorResponse, HealthResponse, KeysResponse, MessageResponse, StatsResponse,
};
