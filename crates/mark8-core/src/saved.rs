//! Products the user saved for later.

use serde::{Deserialize, Serialize};

use crate::models::Product;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedProducts {
    products: Vec<Product>,
}

impl SavedProducts {
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Save a product. Returns false if it was already saved.
    pub fn save(&mut self, product: Product) -> bool {
        if self.is_saved(&product.id) {
            return false;
        }
        self.products.push(product);
        true
    }

    pub fn remove(&mut self, product_id: &str) -> bool {
        let before = self.products.len();
        self.products.retain(|p| p.id != product_id);
        self.products.len() != before
    }

    pub fn is_saved(&self, product_id: &str) -> bool {
        self.products.iter().any(|p| p.id == product_id)
    }

    pub fn count(&self) -> usize {
        self.products.len()
    }
}
