//! Integration tests for Aisle.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p aisle-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_persistence` - Cart and order history surviving a session restart
//! - `catalog_queries` - Loading a feed from disk and running query pipelines
//! - `checkout_flow` - Address through placement, including two-phase placement
//! - `fault_injection` - Every fault forced on, and shared-session contention
//!
//! Every test gets its own [`TestDir`] under the system temp directory, and
//! fault injection stays disabled unless a test turns it on.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aisle_commerce::{
    Catalog, CommerceConfig, FileStore, OrderNumberGenerator, PricingEngine, QueryFaults, Session,
};
use aisle_core::{AddressPreset, Category, Price, Product, ProductId, ShippingAddress};
use uuid::Uuid;

/// A scratch directory removed on drop.
#[derive(Debug)]
pub struct TestDir {
    path: PathBuf,
}

impl TestDir {
    /// Create a fresh directory named after `label`.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    #[must_use]
    pub fn new(label: &str) -> Self {
        let path = std::env::temp_dir().join(format!("aisle-{label}-{}", Uuid::new_v4()));
        fs::create_dir_all(&path).expect("Failed to create test directory");
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A file store rooted in this directory.
    ///
    /// # Panics
    ///
    /// Panics if the store cannot be opened.
    #[must_use]
    pub fn store(&self) -> Arc<FileStore> {
        Arc::new(FileStore::open(self.path.join("data")).expect("Failed to open file store"))
    }

    /// A config pointing the data directory and catalog feed into this directory.
    #[must_use]
    pub fn config(&self) -> CommerceConfig {
        CommerceConfig {
            data_dir: self.path.join("data"),
            catalog_path: self.path.join("products.json"),
            ..CommerceConfig::default()
        }
    }

    /// Write `products` as the catalog feed and return its path.
    ///
    /// # Panics
    ///
    /// Panics if the feed cannot be written.
    pub fn write_catalog(&self, products: &[Product]) -> PathBuf {
        let path = self.path.join("products.json");
        let json = serde_json::to_string_pretty(products).expect("Failed to serialize catalog");
        fs::write(&path, json).expect("Failed to write catalog");
        path
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Build a product with sensible defaults.
#[must_use]
pub fn product(id: &str, name: &str, brand: &str, category: Category, cents: u32) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        brand: brand.to_string(),
        category,
        description: format!("The {name} by {brand}"),
        image_url: String::new(),
        price: Price::from_cents(cents),
        original_price: None,
        specifications: BTreeMap::new(),
        reviews: Vec::new(),
        rating: 4.0,
        review_count: 0,
        in_stock: true,
        is_featured: false,
    }
}

/// A small catalog spanning every category.
#[must_use]
pub fn sample_products() -> Vec<Product> {
    let mut laptop = product("1", "UltraBook Pro", "TechCorp", Category::Laptops, 129_999);
    laptop.rating = 4.6;
    laptop.is_featured = true;
    laptop.original_price = Some(Price::from_cents(149_999));

    let mut tv = product("2", "CrystalView 65", "Vistara", Category::Tvs, 89_999);
    tv.rating = 4.8;
    tv.is_featured = true;

    let mut phone = product("3", "Pixelate X", "Nimbus", Category::Phones, 79_999);
    phone.rating = 4.5;

    let mut console = product(
        "4",
        "GameBox Series Z",
        "Playforge",
        Category::GamingConsoles,
        49_999,
    );
    console.rating = 4.9;

    let mut plug = product("5", "Smart Plug Mini", "Hearth", Category::SmartHome, 1_999);
    plug.rating = 4.2;

    let mut speaker = product("6", "Echo Hub Speaker", "Hearth", Category::SmartHome, 4_999);
    speaker.rating = 4.4;

    vec![laptop, tv, phone, console, plug, speaker]
}

/// [`sample_products`] as a catalog with faults disabled.
#[must_use]
pub fn sample_catalog() -> Arc<Catalog> {
    Arc::new(Catalog::from_products(sample_products(), QueryFaults::default()))
}

/// A deterministic session over the sample catalog, persisted in `dir`.
#[must_use]
pub fn open_session(dir: &TestDir) -> Session {
    Session::new(
        sample_catalog(),
        dir.store(),
        PricingEngine::default(),
        OrderNumberGenerator::default(),
    )
}

/// Fill in a preset address and move the checkout to the summary step.
///
/// # Panics
///
/// Panics if either transition is rejected.
pub fn advance_to_summary(session: &mut Session, preset: AddressPreset) {
    let checkout = session.checkout_mut();
    checkout
        .set_address(ShippingAddress::preset(preset))
        .expect("Failed to set address");
    checkout.advance().expect("Failed to reach payment step");
    checkout.advance().expect("Failed to reach summary step");
}
