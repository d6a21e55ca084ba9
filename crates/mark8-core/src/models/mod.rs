//! Data models for marketplace entities.
//!
//! - `Product`, `ProductPage`, `ProductQuery`: catalog listing and search
//! - `Store`, `StoreQuery`: seller storefronts
//! - `Envelope`: the `{ status, message, data }` wrapper every endpoint uses

pub mod product;
pub mod store;

use serde::Deserialize;

pub use product::{Category, Pagination, Product, ProductPage, ProductQuery, Review, SortOrder, StoreSummary};
pub use store::{Store, StoreList, StoreQuery};

/// Response wrapper shared by all endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
}
