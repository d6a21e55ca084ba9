//! REST API client module for the mark8 marketplace.
//!
//! This module provides the `ApiClient` for products, stores and
//! authentication. Requests carry the session's JWT bearer token and are
//! replayed once after a transparent token refresh when the server answers
//! 401.

pub mod client;
pub mod error;
pub mod pipeline;

pub use client::{ApiClient, DEFAULT_API_URL};
pub use error::{ApiError, ApiResult};
pub use pipeline::{PendingRequest, RequestPipeline};
