use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub thumbnail: Vec<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub store: Option<StoreSummary>,
}

impl Product {
    /// Mean review rating, 0.0 when unreviewed.
    pub fn average_rating(&self) -> f64 {
        if self.reviews.is_empty() {
            return 0.0;
        }
        let total: f64 = self.reviews.iter().map(|r| r.rating).sum();
        total / self.reviews.len() as f64
    }

    pub fn category_name(&self) -> &str {
        self.category.as_ref().map(|c| c.name.as_str()).unwrap_or("Uncategorized")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Review {
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct StoreSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub records_per_page: u32,
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub current_page: u32,
}

impl Pagination {
    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// One page of `/products`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Query parameters for `/products`. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub page_number: Option<u32>,
    pub records_per_page: Option<u32>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub min_unit_price: Option<f64>,
    pub max_unit_price: Option<f64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub store_id: Option<String>,
}

impl ProductQuery {
    pub fn page(page_number: u32, records_per_page: u32) -> Self {
        Self {
            page_number: Some(page_number),
            records_per_page: Some(records_per_page),
            ..Self::default()
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page_number {
            params.push(("pageNumber", page.to_string()));
        }
        if let Some(size) = self.records_per_page {
            params.push(("recordsPerPage", size.to_string()));
        }
        if let Some(ref name) = self.name {
            params.push(("name", name.clone()));
        }
        if let Some(ref category) = self.category {
            params.push(("category", category.clone()));
        }
        if let Some(min) = self.min_unit_price {
            params.push(("minUnitPrice", min.to_string()));
        }
        if let Some(max) = self.max_unit_price {
            params.push(("maxUnitPrice", max.to_string()));
        }
        if let Some(ref sort_by) = self.sort_by {
            params.push(("sortBy", sort_by.clone()));
        }
        if let Some(order) = self.sort_order {
            params.push(("sortOrder", order.as_str().to_string()));
        }
        if let Some(ref store_id) = self.store_id {
            params.push(("storeId", store_id.clone()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Envelope;

    #[test]
    fn test_parse_products_response() {
        let json = r#"{"status":200,"message":"Products fetched","data":{"products":[{"id":"p-1","name":"Kitenge Shirt","description":"Cotton","unitPrice":15000,"thumbnail":["https://cdn/1.png"],"category":{"id":"c-1","name":"Fashion"},"reviews":[{"rating":4,"comment":"Nice"},{"rating":5,"comment":null}],"store":{"id":"s-1","name":"Kigali Threads","logoUrl":null}}],"pagination":{"totalPages":3,"recordsPerPage":9,"totalRecords":25,"currentPage":1}}}"#;

        let resp: Envelope<ProductPage> = serde_json::from_str(json).expect("parse products");
        assert_eq!(resp.status, Some(200));
        assert_eq!(resp.data.products.len(), 1);

        let product = &resp.data.products[0];
        assert_eq!(product.unit_price, 15000.0);
        assert_eq!(product.category_name(), "Fashion");
        assert!((product.average_rating() - 4.5).abs() < f64::EPSILON);
        assert!(resp.data.pagination.has_next_page());
    }

    #[test]
    fn test_sparse_product_tolerated() {
        let product: Product = serde_json::from_str(r#"{"id":"p-2","name":"Mug"}"#).unwrap();
        assert_eq!(product.average_rating(), 0.0);
        assert_eq!(product.category_name(), "Uncategorized");
    }

    #[test]
    fn test_query_params_skip_unset() {
        let mut query = ProductQuery::page(2, 9);
        query.name = Some("shirt".to_string());
        query.sort_order = Some(SortOrder::Desc);

        let params = query.to_params();
        assert_eq!(
            params,
            vec![
                ("pageNumber", "2".to_string()),
                ("recordsPerPage", "9".to_string()),
                ("name", "shirt".to_string()),
                ("sortOrder", "DESC".to_string()),
            ]
        );
    }
}
