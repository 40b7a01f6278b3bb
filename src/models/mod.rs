//! Request and Response models for the image cache API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

pub use requests::{PreloadRequest, ResolveRequest};
pub use responses::{
    ClearResponse, HealthResponse, PreloadResponse, ResolveResponse, StatsResponse,
    TeardownResponse,
};
