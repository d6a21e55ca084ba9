//! mark8 - a command-line storefront for the mark8 marketplace.
//!
//! Browse products and stores, manage a local cart and saved products, and
//! sign in or out. The session is restored from disk on every run and
//! access tokens are renewed automatically when they expire.

mod app;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mark8_core::Config;

use app::App;

#[derive(Debug, Parser)]
#[command(name = "mark8", version, about = "Browse the mark8 marketplace from the terminal")]
struct Cli {
    /// API base URL (overrides the config file)
    #[arg(long, env = "MARK8_API_URL", global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        phone: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List products
    Products {
        /// Search by name
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Show a single product
    Product { id: String },
    /// List stores
    Stores {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Show a single store
    Store { id: String },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Manage saved products
    Saved {
        #[command(subcommand)]
        action: Option<SavedAction>,
    },
    /// Check where a storefront path would lead with the current cookies
    Route { path: String },
}

#[derive(Debug, Subcommand)]
enum CartAction {
    /// Add a product to the cart
    Add {
        product_id: String,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product from the cart
    Remove { product_id: String },
    /// Change the quantity of a cart line
    Update { product_id: String, quantity: u32 },
    /// Empty the cart
    Clear,
}

#[derive(Debug, Subcommand)]
enum SavedAction {
    /// Save a product for later
    Add { product_id: String },
    /// Remove a saved product
    Remove { product_id: String },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mark8.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_url = Some(url);
    }

    let _log_guard = init_tracing(config.log_dir.as_deref());
    info!(api_url = %config.api_url(), "mark8 starting");

    let mut app = App::new(config)?;

    match cli.command {
        Command::Login { email } => app.login(email).await,
        Command::Signup {
            email,
            first_name,
            last_name,
            phone,
        } => app.signup(email, first_name, last_name, phone).await,
        Command::Logout => app.logout(),
        Command::Whoami => app.whoami(),
        Command::Products {
            search,
            category,
            pages,
        } => app.list_products(search, category, pages).await,
        Command::Product { id } => app.show_product(&id).await,
        Command::Stores { search, pages } => app.list_stores(search, pages).await,
        Command::Store { id } => app.show_store(&id).await,
        Command::Cart { action } => match action {
            None => app.show_cart(),
            Some(CartAction::Add {
                product_id,
                quantity,
            }) => app.add_to_cart(&product_id, quantity).await,
            Some(CartAction::Remove { product_id }) => app.remove_from_cart(&product_id),
            Some(CartAction::Update {
                product_id,
                quantity,
            }) => app.update_cart(&product_id, quantity),
            Some(CartAction::Clear) => app.clear_cart(),
        },
        Command::Saved { action } => match action {
            None => app.show_saved(),
            Some(SavedAction::Add { product_id }) => app.save_product(&product_id).await,
            Some(SavedAction::Remove { product_id }) => app.unsave_product(&product_id),
        },
        Command::Route { path } => app.check_route(&path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_cart_add() {
        let cli = Cli::try_parse_from(["mark8", "cart", "add", "p-1", "--quantity", "3"]).unwrap();
        match cli.command {
            Command::Cart {
                action: Some(CartAction::Add { product_id, quantity }),
            } => {
                assert_eq!(product_id, "p-1");
                assert_eq!(quantity, 3);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
