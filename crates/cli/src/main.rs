//! Aisle CLI - Browse the catalog, manage the cart, and check out.
//!
//! # Usage
//!
//! ```bash
//! # Browse and search the catalog
//! aisle catalog list --category laptops --sort price-asc
//! aisle catalog search "pro" --max-price 1000
//! aisle catalog show 1
//!
//! # Manage the cart
//! aisle cart add 1 --quantity 2
//! aisle cart set <line-id> 3
//! aisle cart show
//!
//! # Check out with a preset address
//! aisle checkout --preset home --payment paypal
//!
//! # List placed orders
//! aisle orders
//! ```
//!
//! # Commands
//!
//! - `catalog` - List, search, and show products
//! - `cart` - Show and edit the persisted cart
//! - `checkout` - Walk the checkout steps and place an order
//! - `orders` - List the order history

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use aisle_commerce::{CommerceConfig, FaultConfig, Session};
use aisle_core::{Category, LineId, PaymentMethod, ProductId, SortOption};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "aisle")]
#[command(author, version, about = "Aisle shopping CLI")]
struct Cli {
    /// Directory holding the cart and order history (overrides `AISLE_DATA_DIR`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Product feed JSON file (overrides `AISLE_CATALOG_PATH`)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Enable every fault at the storefront's original rates
    #[arg(long, global = true)]
    original_faults: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Show and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the current cart
    Checkout(CheckoutArgs),
    /// List placed orders
    Orders,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List products
    List(FilterArgs),
    /// Search products by name, brand, or description
    Search {
        /// Search text
        query: String,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show one product
    Show {
        /// Product ID
        id: ProductId,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Only products in this category (`laptops`, `tvs`, `phones`, `gaming`, `smart-home`)
    #[arg(short, long)]
    category: Option<Category>,

    /// Sort order (`featured`, `price-asc`, `price-desc`, `rating`, `newest`)
    #[arg(short, long, default_value = "featured")]
    sort: SortOption,

    /// Lowest price to include
    #[arg(long)]
    min_price: Option<rust_decimal::Decimal>,

    /// Highest price to include
    #[arg(long)]
    max_price: Option<rust_decimal::Decimal>,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and totals
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        product_id: ProductId,

        /// Units to add
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line from the cart
    Remove {
        /// Line ID
        line_id: LineId,
    },
    /// Set a line's quantity (zero removes it)
    Set {
        /// Line ID
        line_id: LineId,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
    /// Update cart lines with current catalog data
    Refresh,
}

#[derive(Args)]
struct CheckoutArgs {
    /// Use a saved address instead of the address flags
    #[arg(long, value_enum, conflicts_with_all = ["name", "street", "city", "state", "zip"])]
    preset: Option<PresetArg>,

    /// Recipient name
    #[arg(long)]
    name: Option<String>,

    /// Street address
    #[arg(long)]
    street: Option<String>,

    /// City
    #[arg(long)]
    city: Option<String>,

    /// State
    #[arg(long)]
    state: Option<String>,

    /// ZIP code
    #[arg(long)]
    zip: Option<String>,

    /// Payment method (`credit_card`, `debit_card`, `paypal`, `apple_pay`)
    #[arg(short, long, default_value = "credit_card")]
    payment: PaymentMethod,
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    Home,
    Work,
    Demo,
}

/// Initialize Sentry if `SENTRY_DSN` is set.
fn init_sentry(config: &CommerceConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = CommerceConfig::from_env();

    // Initialize Sentry (must be done before tracing subscriber)
    let sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "aisle_commerce=info,aisle_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mut config: CommerceConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(catalog) = cli.catalog {
        config.catalog_path = catalog;
    }
    if cli.original_faults {
        config.faults = FaultConfig::original_rates();
    }

    let mut session = Session::open(&config)?;

    match cli.command {
        Commands::Catalog { action } => match action {
            CatalogAction::List(filter) => {
                commands::catalog::list(&session, "", &filter.into_query_args())?;
            }
            CatalogAction::Search { query, filter } => {
                commands::catalog::list(&session, &query, &filter.into_query_args())?;
            }
            CatalogAction::Show { id } => commands::catalog::show(&session, &id)?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&session),
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(&mut session, &product_id, quantity)?,
            CartAction::Remove { line_id } => commands::cart::remove(&mut session, line_id),
            CartAction::Set { line_id, quantity } => {
                commands::cart::set(&mut session, line_id, quantity)?;
            }
            CartAction::Clear => commands::cart::clear(&mut session),
            CartAction::Refresh => commands::cart::refresh(&mut session),
        },
        Commands::Checkout(args) => {
            let address = args.address();
            commands::checkout::run(&mut session, address, args.payment, config.checkout_delay)
                .await?;
        }
        Commands::Orders => commands::orders::list(&session),
    }
    Ok(())
}

impl FilterArgs {
    fn into_query_args(self) -> commands::catalog::QueryArgs {
        commands::catalog::QueryArgs {
            category: self.category,
            sort: self.sort,
            min_price: self.min_price,
            max_price: self.max_price,
        }
    }
}

impl CheckoutArgs {
    fn address(&self) -> aisle_core::ShippingAddress {
        match self.preset {
            Some(preset) => aisle_core::ShippingAddress::preset(match preset {
                PresetArg::Home => aisle_core::AddressPreset::Home,
                PresetArg::Work => aisle_core::AddressPreset::Work,
                PresetArg::Demo => aisle_core::AddressPreset::Demo,
            }),
            None => aisle_core::ShippingAddress::new(
                self.name.clone().unwrap_or_default(),
                self.street.clone().unwrap_or_default(),
                self.city.clone().unwrap_or_default(),
                self.state.clone().unwrap_or_default(),
                self.zip.clone().unwrap_or_default(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_checkout_with_preset() {
        let cli = Cli::try_parse_from([
            "aisle", "checkout", "--preset", "work", "--payment", "paypal",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        let Commands::Checkout(args) = cli.command else {
            panic!("expected checkout");
        };
        assert_eq!(args.payment, PaymentMethod::PayPal);
        assert_eq!(args.address().city, "Corporate City");
    }

    #[test]
    fn test_preset_conflicts_with_address_flags() {
        let result = Cli::try_parse_from(["aisle", "checkout", "--preset", "home", "--name", "X"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_negative_quantity() {
        let cli = Cli::try_parse_from(["aisle", "cart", "add", "1", "--quantity", "-2"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Cart {
                action: CartAction::Add { quantity: -2, .. }
            }
        ));
    }
}
