//! Command handlers for the mark8 CLI.
//!
//! `App` wires the restored session, API client and local cache together and
//! prints results for each sub-command.

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use tracing::{error, warn};

use mark8_core::api::{ApiClient, ApiError};
use mark8_core::auth::guard::route_access;
use mark8_core::auth::{CookieJar, LoginRequest, SignupRequest};
use mark8_core::cache::CacheManager;
use mark8_core::cart::CartItem;
use mark8_core::catalog::{ProductFeed, StoreDirectory};
use mark8_core::models::Product;
use mark8_core::utils::{format_price, format_rating, truncate_string};
use mark8_core::Config;

/// Width of the product name column
const NAME_WIDTH: usize = 36;

/// True when `error` came from a session that was live and has now been torn
/// down by a failed refresh.
fn session_ended(error: &ApiError, was_signed_in: bool, signed_in: bool) -> bool {
    error.is_unauthorized() && was_signed_in && !signed_in
}

pub struct App {
    config: Config,
    api: ApiClient,
    cache: CacheManager,
    /// Whether a session was restored when the command started
    signed_in_at_start: bool,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let api = config.connect()?;
        let cache = CacheManager::new(config.data_dir()?)?;
        let signed_in_at_start = api.credentials().is_authenticated();
        Ok(Self {
            config,
            api,
            cache,
            signed_in_at_start,
        })
    }

    /// Turn an API error into a user-facing one, noting when the session ended.
    fn explain(&self, e: ApiError) -> anyhow::Error {
        if session_ended(
            &e,
            self.signed_in_at_start,
            self.api.credentials().is_authenticated(),
        ) {
            // Session-dependent state goes with the session
            if let Err(clear_err) = self.cache.clear() {
                warn!(error = %clear_err, "Failed to clear local state after session ended");
            }
            return anyhow::anyhow!("Your session has expired. Run `mark8 login` to sign in again.");
        }
        match e {
            ApiError::Unauthorized => {
                anyhow::anyhow!("You need to be signed in. Run `mark8 login` first.")
            }
            ApiError::NetworkError(ref inner) if inner.is_timeout() => {
                anyhow::anyhow!("Connection timed out. Please try again.")
            }
            ApiError::NetworkError(ref inner) if inner.is_connect() => {
                anyhow::anyhow!("Unable to connect to {}. Check your internet connection.", self.api.base_url())
            }
            other => other.into(),
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    fn prompt(label: &str) -> Result<String> {
        print!("{}: ", label);
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }

    fn prompt_password() -> Result<String> {
        rpassword::prompt_password("Password: ").context("Failed to read password")
    }

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email {
            Some(email) => email,
            None => match self.config.last_email.clone() {
                Some(last) => {
                    let input = Self::prompt(&format!("Email [{}]", last))?;
                    if input.is_empty() {
                        last
                    } else {
                        input
                    }
                }
                None => Self::prompt("Email")?,
            },
        };
        let password = Self::prompt_password()?;

        let user = match self.api.login(&LoginRequest::new(email, password)).await {
            Ok(user) => user,
            Err(ApiError::Unauthorized) => bail!("Invalid email or password"),
            Err(e) => {
                error!(error = %e, "Login failed");
                return Err(self.explain(e));
            }
        };

        self.config.last_email = Some(user.email.clone());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
        println!("Signed in as {} <{}>", user.full_name(), user.email);
        Ok(())
    }

    pub async fn signup(
        &mut self,
        email: String,
        first_name: String,
        last_name: String,
        phone_number: String,
    ) -> Result<()> {
        let password = Self::prompt_password()?;
        let request = SignupRequest {
            email,
            password,
            first_name,
            last_name,
            phone_number,
        };

        let user = match self.api.signup(&request).await {
            Ok(user) => user,
            Err(ApiError::Unauthorized) => bail!("Invalid email or password"),
            Err(e) => {
                error!(error = %e, "Signup failed");
                return Err(self.explain(e));
            }
        };

        self.config.last_email = Some(user.email.clone());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
        println!("Welcome, {}! You are signed in.", user.first_name);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<()> {
        self.api.logout()?;
        self.cache.clear()?;
        println!("Signed out.");
        Ok(())
    }

    pub fn whoami(&self) -> Result<()> {
        let credentials = self.api.credentials().snapshot();
        match (credentials.is_authenticated(), credentials.user()) {
            (true, Some(user)) => println!("{} <{}>", user.full_name(), user.email),
            (true, None) => println!("Signed in (profile not loaded)"),
            (false, _) => println!("Not signed in"),
        }
        Ok(())
    }

    pub fn check_route(&self, path: &str) -> Result<()> {
        let tokens = CookieJar::new(&self.config.data_dir()?).tokens()?;
        match route_access(path, &tokens).location() {
            Some(target) => println!("{} -> redirect to {}", path, target),
            None => println!("{} -> allowed", path),
        }
        Ok(())
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    fn print_product_row(product: &Product, saved: bool) {
        println!(
            "{:<12} {:<width$} {:>14} {:>5}{}",
            truncate_string(&product.id, 12),
            truncate_string(&product.name, NAME_WIDTH),
            format_price(product.unit_price),
            format_rating(Some(product.average_rating())),
            if saved { "  *" } else { "" },
            width = NAME_WIDTH,
        );
    }

    pub async fn list_products(
        &self,
        search: Option<String>,
        category: Option<String>,
        pages: u32,
    ) -> Result<()> {
        let mut feed = ProductFeed::new();
        if let Some(category) = category {
            feed.set_category(category);
        }
        if let Some(search) = search {
            feed.set_search_query(search);
        }

        feed.fetch(&self.api).await.map_err(|e| self.explain(e))?;
        for _ in 1..pages.max(1) {
            if !feed.load_more(&self.api).await.map_err(|e| self.explain(e))? {
                break;
            }
        }

        if feed.products().is_empty() {
            println!("No products found.");
            return Ok(());
        }

        let saved = self.cache.load_saved();
        for product in feed.products() {
            Self::print_product_row(product, saved.is_saved(&product.id));
        }
        println!(
            "\nShowing {} of {} products{}",
            feed.products().len(),
            feed.total_products(),
            if feed.has_next_page() { " (more available)" } else { "" }
        );
        Ok(())
    }

    pub async fn show_product(&self, id: &str) -> Result<()> {
        let product = self.api.fetch_product(id).await.map_err(|e| self.explain(e))?;

        println!("{}", product.name);
        println!("  Price:    {}", format_price(product.unit_price));
        println!("  Category: {}", product.category_name());
        if let Some(ref store) = product.store {
            println!("  Store:    {} ({})", store.name, store.id);
        }
        println!(
            "  Rating:   {} ({} reviews)",
            format_rating(Some(product.average_rating())),
            product.reviews.len()
        );
        if let Some(ref description) = product.description {
            println!("\n{}", description);
        }
        let in_cart = self.cache.load_cart().item_quantity(&product.id);
        if in_cart > 0 {
            println!("\nIn cart: {}", in_cart);
        }
        Ok(())
    }

    pub async fn list_stores(&self, search: Option<String>, pages: u32) -> Result<()> {
        let mut directory = StoreDirectory::new();
        let loaded = match search {
            Some(term) => directory.search(&self.api, term).await,
            None => directory.fetch(&self.api).await,
        };
        loaded.map_err(|e| self.explain(e))?;

        for _ in 1..pages.max(1) {
            if !directory.load_more(&self.api).await.map_err(|e| self.explain(e))? {
                break;
            }
        }

        if directory.stores().is_empty() {
            println!("No stores found.");
            return Ok(());
        }
        for store in directory.filtered() {
            println!(
                "{:<12} {:<width$} {:>4} products  {:>4}",
                truncate_string(&store.id, 12),
                truncate_string(&store.name, NAME_WIDTH),
                store.number_of_products,
                store.rating_display(),
                width = NAME_WIDTH,
            );
        }
        Ok(())
    }

    pub async fn show_store(&self, id: &str) -> Result<()> {
        let store = self.api.fetch_store(id).await.map_err(|e| self.explain(e))?;
        println!("{}", store.name);
        println!("  Products: {}", store.number_of_products);
        println!(
            "  Rating:   {} ({} reviews)",
            store.rating_display(),
            store.review_count.unwrap_or(0)
        );
        if let Some(ref description) = store.description {
            println!("\n{}", description);
        }
        Ok(())
    }

    // =========================================================================
    // Cart and saved products
    // =========================================================================

    pub fn show_cart(&self) -> Result<()> {
        let cart = self.cache.load_cart();
        if cart.is_empty() {
            println!("Your cart is empty.");
            return Ok(());
        }
        for item in cart.items() {
            println!(
                "{:<12} {:<width$} {:>3} x {:>12} = {:>14}",
                truncate_string(&item.id, 12),
                truncate_string(&item.name, NAME_WIDTH),
                item.quantity,
                format_price(item.price),
                format_price(item.subtotal()),
                width = NAME_WIDTH,
            );
        }
        println!(
            "\n{} items, total {}",
            cart.total_items(),
            format_price(cart.total_price())
        );
        if let Some(age) = self.cache.cart_age() {
            println!("Last updated {}", age);
        }
        Ok(())
    }

    pub async fn add_to_cart(&self, product_id: &str, quantity: u32) -> Result<()> {
        let product = self
            .api
            .fetch_product(product_id)
            .await
            .map_err(|e| self.explain(e))?;

        let mut cart = self.cache.load_cart();
        cart.add_item(CartItem::from(&product), quantity);
        self.cache.save_cart(&cart)?;
        println!(
            "Added {} x {} ({} in cart)",
            quantity,
            product.name,
            cart.item_quantity(&product.id)
        );
        Ok(())
    }

    pub fn remove_from_cart(&self, product_id: &str) -> Result<()> {
        let mut cart = self.cache.load_cart();
        if !cart.remove_item(product_id) {
            bail!("{} is not in your cart", product_id);
        }
        self.cache.save_cart(&cart)?;
        println!("Removed {} from cart", product_id);
        Ok(())
    }

    pub fn update_cart(&self, product_id: &str, quantity: u32) -> Result<()> {
        let mut cart = self.cache.load_cart();
        if !cart.update_quantity(product_id, quantity) {
            bail!("{} is not in your cart", product_id);
        }
        self.cache.save_cart(&cart)?;
        println!("{} quantity set to {}", product_id, cart.item_quantity(product_id));
        Ok(())
    }

    pub fn clear_cart(&self) -> Result<()> {
        let mut cart = self.cache.load_cart();
        cart.clear();
        self.cache.save_cart(&cart)?;
        println!("Cart cleared.");
        Ok(())
    }

    pub fn show_saved(&self) -> Result<()> {
        let saved = self.cache.load_saved();
        if saved.count() == 0 {
            println!("No saved products.");
            return Ok(());
        }
        for product in saved.products() {
            Self::print_product_row(product, true);
        }
        println!("\n{} saved", saved.count());
        Ok(())
    }

    pub async fn save_product(&self, product_id: &str) -> Result<()> {
        let mut saved = self.cache.load_saved();
        if saved.is_saved(product_id) {
            println!("{} is already saved", product_id);
            return Ok(());
        }
        let product = self
            .api
            .fetch_product(product_id)
            .await
            .map_err(|e| self.explain(e))?;
        let name = product.name.clone();
        saved.save(product);
        self.cache.save_saved(&saved)?;
        println!("Saved {}", name);
        Ok(())
    }

    pub fn unsave_product(&self, product_id: &str) -> Result<()> {
        let mut saved = self.cache.load_saved();
        if !saved.remove(product_id) {
            bail!("{} is not in your saved products", product_id);
        }
        self.cache.save_saved(&saved)?;
        println!("Removed {} from saved products", product_id);
        Ok(())
    }
}
