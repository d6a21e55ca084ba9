//! mark8 storefront client library.
//!
//! The centre of the crate is the authenticated API session: a
//! [`CredentialStore`](auth::CredentialStore) holding the token pair, a
//! request pipeline that attaches the bearer token and renews it once on
//! 401, and a refresh coordinator that collapses concurrent renewals into a
//! single call. Catalog paging, the cart and saved products build on top.

pub mod api;
pub mod auth;
pub mod cache;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod models;
pub mod saved;
pub mod utils;

pub use api::{ApiClient, ApiError, ApiResult};
pub use auth::{CredentialStore, Credentials, User};
pub use config::Config;
