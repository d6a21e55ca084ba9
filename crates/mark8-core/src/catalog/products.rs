use tracing::{debug, warn};

use crate::api::{ApiClient, ApiResult};
use crate::models::{Product, ProductPage, ProductQuery};

/// Products requested per page.
pub const PRODUCTS_PAGE_SIZE: u32 = 9;

/// Category value meaning "no category filter".
pub const ALL_CATEGORIES: &str = "all";

/// Paged, searchable product listing.
#[derive(Debug, Clone)]
pub struct ProductFeed {
    products: Vec<Product>,
    total_products: u64,
    search_query: String,
    category: String,
    current_page: u32,
    has_next_page: bool,
    last_error: Option<String>,
}

impl Default for ProductFeed {
    fn default() -> Self {
        Self {
            products: Vec::new(),
            total_products: 0,
            search_query: String::new(),
            category: ALL_CATEGORIES.to_string(),
            current_page: 1,
            has_next_page: true,
            last_error: None,
        }
    }
}

impl ProductFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn total_products(&self) -> u64 {
        self.total_products
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Change the search text; the next fetch starts over at page 1.
    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
        self.current_page = 1;
        self.products.clear();
    }

    /// Change the category filter; the next fetch starts over at page 1.
    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
        self.current_page = 1;
        self.products.clear();
    }

    /// Drop loaded products but keep search and filter.
    pub fn reset(&mut self) {
        self.products.clear();
        self.current_page = 1;
        self.has_next_page = true;
    }

    /// Query for the current page, search and category.
    pub fn query(&self) -> ProductQuery {
        let mut query = ProductQuery::page(self.current_page, PRODUCTS_PAGE_SIZE);
        if !self.search_query.is_empty() {
            query.name = Some(self.search_query.clone());
        }
        if self.category != ALL_CATEGORIES {
            query.category = Some(self.category.clone());
        }
        query
    }

    /// Merge a fetched page: page 1 replaces, later pages append.
    pub fn apply_page(&mut self, page: ProductPage) {
        let requested = self.current_page;
        if requested <= 1 {
            self.products = page.products;
        } else {
            self.products.extend(page.products);
        }
        self.total_products = page.pagination.total_records;
        if page.pagination.current_page > 0 {
            self.current_page = page.pagination.current_page;
        }
        self.has_next_page = page.pagination.has_next_page();
        self.last_error = None;
    }

    /// Fetch the current page.
    pub async fn fetch(&mut self, api: &ApiClient) -> ApiResult<()> {
        let query = self.query();
        debug!(page = self.current_page, search = %self.search_query, category = %self.category, "Fetching products");
        match api.fetch_products(&query).await {
            Ok(page) => {
                self.apply_page(page);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch products");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Start a new search from page 1.
    pub async fn search(&mut self, api: &ApiClient, query: impl Into<String>) -> ApiResult<()> {
        self.set_search_query(query);
        self.fetch(api).await
    }

    /// Fetch the next page if there is one. Returns whether a page was loaded.
    pub async fn load_more(&mut self, api: &ApiClient) -> ApiResult<bool> {
        if !self.has_next_page {
            return Ok(false);
        }
        self.current_page += 1;
        if let Err(e) = self.fetch(api).await {
            self.current_page -= 1;
            return Err(e);
        }
        Ok(true)
    }

    /// Clear search and category, then reload page 1.
    pub async fn clear_search_and_fetch(&mut self, api: &ApiClient) -> ApiResult<()> {
        self.search_query.clear();
        self.category = ALL_CATEGORIES.to_string();
        self.reset();
        self.fetch(api).await
    }
}
