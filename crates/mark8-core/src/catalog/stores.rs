use tracing::{debug, warn};

use crate::api::{ApiClient, ApiResult};
use crate::models::{SortOrder, Store, StoreQuery};

/// Stores requested per page.
pub const STORES_PAGE_SIZE: u32 = 10;

/// Newest stores first.
const STORES_SORT_BY: &str = "createdAt";

/// Paged store listing with a name search.
#[derive(Debug, Clone)]
pub struct StoreDirectory {
    stores: Vec<Store>,
    search_term: String,
    page: u32,
    has_more: bool,
    last_error: Option<String>,
}

impl Default for StoreDirectory {
    fn default() -> Self {
        Self {
            stores: Vec::new(),
            search_term: String::new(),
            page: 1,
            has_more: true,
            last_error: None,
        }
    }
}

impl StoreDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stores(&self) -> &[Store] {
        &self.stores
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn total_stores(&self) -> usize {
        self.stores.len()
    }

    /// Loaded stores whose name contains the search term, ignoring case.
    pub fn filtered(&self) -> Vec<&Store> {
        let term = self.search_term.trim().to_lowercase();
        if term.is_empty() {
            return self.stores.iter().collect();
        }
        self.stores
            .iter()
            .filter(|s| s.name.to_lowercase().contains(&term))
            .collect()
    }

    pub fn reset(&mut self) {
        self.stores.clear();
        self.page = 1;
        self.has_more = true;
    }

    pub fn query(&self) -> StoreQuery {
        StoreQuery {
            name: Some(self.search_term.clone()),
            page_number: Some(self.page),
            records_per_page: Some(STORES_PAGE_SIZE),
            sort_by: Some(STORES_SORT_BY.to_string()),
            sort_order: Some(SortOrder::Desc),
        }
    }

    /// Merge a fetched page. A short page means there is nothing more.
    pub fn apply_page(&mut self, stores: Vec<Store>) {
        self.has_more = stores.len() == STORES_PAGE_SIZE as usize;
        if self.page <= 1 {
            self.stores = stores;
        } else {
            self.stores.extend(stores);
        }
        self.last_error = None;
    }

    /// Fetch the current page.
    pub async fn fetch(&mut self, api: &ApiClient) -> ApiResult<()> {
        debug!(page = self.page, search = %self.search_term, "Fetching stores");
        match api.fetch_stores(&self.query()).await {
            Ok(stores) => {
                self.apply_page(stores);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch stores");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Search by name from the first page.
    pub async fn search(&mut self, api: &ApiClient, term: impl Into<String>) -> ApiResult<()> {
        self.search_term = term.into();
        self.page = 1;
        if let Err(e) = self.fetch(api).await {
            self.stores.clear();
            return Err(e);
        }
        Ok(())
    }

    /// Fetch the next page if the last one was full.
    pub async fn load_more(&mut self, api: &ApiClient) -> ApiResult<bool> {
        if !self.has_more {
            return Ok(false);
        }
        self.page += 1;
        if let Err(e) = self.fetch(api).await {
            self.page -= 1;
            return Err(e);
        }
        Ok(true)
    }

    pub async fn clear_search_and_fetch(&mut self, api: &ApiClient) -> ApiResult<()> {
        self.search_term.clear();
        self.reset();
        self.fetch(api).await
    }
}
