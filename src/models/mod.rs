//! Response models for the demo server
//!
//! DTOs serialized into the JSON bodies of the server's own endpoints.

pub mod responses;

// Re-export commonly used types
pub use responses::HealthResponse;
