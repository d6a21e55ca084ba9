use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cart::Cart;
use crate::saved::SavedProducts;

const CART_KEY: &str = "cart-storage";
const SAVED_KEY: &str = "product-storage";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;

        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(self.cache_path(name), contents)
            .with_context(|| format!("Failed to write cache file: {}", name))?;
        debug!(cache = name, "Saved");
        Ok(())
    }

    /// Load, falling back to the default value on a missing or unreadable file
    fn load_or_default<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        match self.load(name) {
            Ok(Some(cached)) => cached.data,
            Ok(None) => T::default(),
            Err(e) => {
                warn!(cache = name, error = %e, "Discarding unreadable cache");
                T::default()
            }
        }
    }

    // ===== Cart =====

    pub fn load_cart(&self) -> Cart {
        self.load_or_default(CART_KEY)
    }

    pub fn save_cart(&self, cart: &Cart) -> Result<()> {
        self.save(CART_KEY, cart)
    }

    pub fn cart_age(&self) -> Option<String> {
        self.load::<Cart>(CART_KEY).ok().flatten().map(|c| c.age_display())
    }

    // ===== Saved Products =====

    pub fn load_saved(&self) -> SavedProducts {
        self.load_or_default(SAVED_KEY)
    }

    pub fn save_saved(&self, saved: &SavedProducts) -> Result<()> {
        self.save(SAVED_KEY, saved)
    }

    /// Remove all session-dependent state
    pub fn clear(&self) -> Result<()> {
        for name in [CART_KEY, SAVED_KEY] {
            let path = self.cache_path(name);
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove cache file: {}", name))?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
