//! Client-side catalog state: product feed and store directory.
//!
//! Both mirror what the storefront shows: the items loaded so far, the
//! active search and filter, and whether another page can be loaded.

pub mod products;
pub mod stores;

pub use products::{ProductFeed, ALL_CATEGORIES, PRODUCTS_PAGE_SIZE};
pub use stores::{StoreDirectory, STORES_PAGE_SIZE};
