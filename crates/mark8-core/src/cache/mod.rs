//! Local persistence for client-side shopping state.
//!
//! This module provides the `CacheManager` for storing the cart and saved
//! products between runs. Each entry is a JSON file stamped with the time it
//! was written.

pub mod manager;

pub use manager::{CacheManager, CachedData};
