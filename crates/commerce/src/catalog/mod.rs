//! Product catalog for a session.
//!
//! The catalog is loaded once from a [`CatalogSource`] and never changes
//! afterwards. Loading cannot fail: a missing or corrupt feed yields an empty
//! catalog, and individual invalid records are skipped.
//!
//! Query operations (search, category and price filters, sorting) live in
//! [`query`].

mod query;
mod source;

use std::collections::HashSet;
use std::io;

use aisle_core::{Product, ProductId};
use thiserror::Error;
use tracing::{debug, warn};

use crate::faults::{self, SharedFault};

pub use query::{CatalogQuery, PriceRange, filter_by_category, filter_by_price};
pub use source::{CatalogSource, JsonFileCatalog, StaticCatalog};

/// Errors raised while loading or querying the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The feed could not be read.
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The feed is not a valid product list.
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// A price range with its lower bound above its upper bound.
    #[error("invalid price range: min {min} is above max {max}")]
    InvalidPriceRange { min: String, max: String },
}

/// Fault policies applied to catalog queries.
#[derive(Debug, Clone)]
pub struct QueryFaults {
    /// Reverses results sorted by [`SortOption::Newest`](aisle_core::SortOption::Newest).
    pub newest_reversal: SharedFault,
    /// Empties the results of a non-empty search longer than three characters.
    pub search_dropout: SharedFault,
}

impl Default for QueryFaults {
    fn default() -> Self {
        Self {
            newest_reversal: faults::disabled(),
            search_dropout: faults::disabled(),
        }
    }
}

/// The immutable product catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    faults: QueryFaults,
}

impl Catalog {
    /// Build a catalog from a supplier.
    ///
    /// Supply failures are logged and produce an empty catalog.
    #[must_use]
    pub fn from_source(source: &dyn CatalogSource, faults: QueryFaults) -> Self {
        match source.load() {
            Ok(products) => Self::from_products(products, faults),
            Err(e) => {
                warn!(error = %e, "Catalog supply failed, starting with an empty catalog");
                Self {
                    products: Vec::new(),
                    faults,
                }
            }
        }
    }

    /// Build a catalog from products already in memory.
    ///
    /// Invalid products and repeated IDs are skipped; the remaining products
    /// keep their supplied order.
    #[must_use]
    pub fn from_products(products: Vec<Product>, faults: QueryFaults) -> Self {
        let mut seen = HashSet::new();
        let supplied = products.len();
        let products: Vec<Product> = products
            .into_iter()
            .filter(|product| {
                if let Err(e) = product.validate() {
                    warn!(product_id = %product.id, error = %e, "Skipping invalid product");
                    return false;
                }
                if !seen.insert(product.id.clone()) {
                    warn!(product_id = %product.id, "Skipping duplicate product id");
                    return false;
                }
                true
            })
            .collect();

        debug!(supplied, loaded = products.len(), "Catalog loaded");
        Self { products, faults }
    }

    /// Look up a product by ID.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|product| &product.id == id)
    }

    /// All products in load order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Featured products in load order.
    #[must_use]
    pub fn featured(&self) -> Vec<&Product> {
        self.products.iter().filter(|p| p.is_featured).collect()
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns true if the catalog holds no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub(crate) const fn faults(&self) -> &QueryFaults {
        &self.faults
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use aisle_core::{Category, Price};

    use super::*;

    pub(crate) fn product(id: &str, name: &str, category: Category, cents: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            brand: "Acme".to_string(),
            category,
            description: format!("{name} description"),
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

    struct FailingSource;

    impl CatalogSource for FailingSource {
        fn load(&self) -> Result<Vec<Product>, CatalogError> {
            Err(CatalogError::Read {
                path: "missing.json".to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "gone"),
            })
        }
    }

    #[test]
    fn test_supply_failure_yields_empty_catalog() {
        let catalog = Catalog::from_source(&FailingSource, QueryFaults::default());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_missing_file_yields_empty_catalog() {
        let source = JsonFileCatalog::new("/definitely/not/here/products.json");
        let catalog = Catalog::from_source(&source, QueryFaults::default());
        assert_eq!(catalog.len(), 0);
    }

    #[test]
    fn test_invalid_and_duplicate_products_are_skipped() {
        let mut discounted_wrong = product("2", "Bad Sale", Category::Tvs, 50_000);
        discounted_wrong.original_price = Some(Price::from_cents(40_000));

        let catalog = Catalog::from_products(
            vec![
                product("1", "Laptop", Category::Laptops, 100_000),
                discounted_wrong,
                product("1", "Laptop Again", Category::Laptops, 90_000),
                product("3", "Phone", Category::Phones, 70_000),
            ],
            QueryFaults::default(),
        );

        let ids: Vec<&str> = catalog.products().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(catalog.get(&ProductId::new("1")).unwrap().name, "Laptop");
        assert!(catalog.get(&ProductId::new("2")).is_none());
    }

    #[test]
    fn test_featured_keeps_load_order() {
        let mut a = product("a", "A", Category::Phones, 100);
        let b = product("b", "B", Category::Phones, 100);
        let mut c = product("c", "C", Category::Phones, 100);
        a.is_featured = true;
        c.is_featured = true;
        let catalog = Catalog::from_products(vec![a, b, c], QueryFaults::default());
        let ids: Vec<&str> = catalog.featured().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_json_catalog_parse_error_is_reported() {
        let name = format!("aisle-bad-catalog-{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, "{not json").unwrap();
        let result = JsonFileCatalog::new(&path).load();
        assert!(matches!(result, Err(CatalogError::Parse(_))));
        let _ = std::fs::remove_file(&path);
    }
}
