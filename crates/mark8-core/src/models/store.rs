//! Seller storefront models.

use serde::{Deserialize, Serialize};

use super::SortOrder;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Store {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub number_of_products: u32,
    #[serde(default, alias = "image")]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<u32>,
}

impl Store {
    pub fn rating_display(&self) -> String {
        match self.rating {
            Some(rating) => format!("{:.1}", rating),
            None => "N/A".to_string(),
        }
    }
}

/// `data` payload of `/store`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreList {
    #[serde(default)]
    pub stores: Vec<Store>,
}

/// Query parameters for `/store`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreQuery {
    pub name: Option<String>,
    pub page_number: Option<u32>,
    pub records_per_page: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl StoreQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref name) = self.name {
            params.push(("name", name.clone()));
        }
        if let Some(page) = self.page_number {
            params.push(("pageNumber", page.to_string()));
        }
        if let Some(size) = self.records_per_page {
            params.push(("recordsPerPage", size.to_string()));
        }
        if let Some(ref sort_by) = self.sort_by {
            params.push(("sortBy", sort_by.clone()));
        }
        if let Some(order) = self.sort_order {
            params.push(("sortOrder", order.as_str().to_string()));
        }
        params
    }
}
