//! Catalog queries: search, filter, sort.
//!
//! A full query runs search, then the category filter, then the price range,
//! then the sort. Filtering first keeps the sort small and guarantees that a
//! result count taken from the filtered list matches the rendered list.

use aisle_core::{Category, Price, Product, SortOption};
use tracing::debug;

use super::{Catalog, CatalogError};

/// Inclusive price bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRange {
    min: Price,
    max: Price,
}

impl PriceRange {
    /// Create a range covering `min..=max`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidPriceRange`] if `min > max`.
    pub fn new(min: Price, max: Price) -> Result<Self, CatalogError> {
        if min > max {
            return Err(CatalogError::InvalidPriceRange {
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(Self { min, max })
    }

    /// Lower bound.
    #[must_use]
    pub const fn min(&self) -> Price {
        self.min
    }

    /// Upper bound.
    #[must_use]
    pub const fn max(&self) -> Price {
        self.max
    }

    /// Returns true if `price` lies within the bounds.
    #[must_use]
    pub fn contains(&self, price: Price) -> bool {
        self.min <= price && price <= self.max
    }
}

/// A complete query pipeline description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub text: String,
    pub category: Option<Category>,
    pub price_range: Option<PriceRange>,
    pub sort: SortOption,
}

/// Keep products in `category`, preserving order.
#[must_use]
pub fn filter_by_category(products: Vec<&Product>, category: Category) -> Vec<&Product> {
    products
        .into_iter()
        .filter(|product| product.category == category)
        .collect()
}

/// Keep products whose price lies in `range`, preserving order.
#[must_use]
pub fn filter_by_price<'a>(products: Vec<&'a Product>, range: &PriceRange) -> Vec<&'a Product> {
    products
        .into_iter()
        .filter(|product| range.contains(product.price))
        .collect()
}

impl Catalog {
    /// Products in `category`, in load order.
    #[must_use]
    pub fn by_category(&self, category: Category) -> Vec<&Product> {
        filter_by_category(self.products.iter().collect(), category)
    }

    /// Case-insensitive substring search over name, brand, and description.
    ///
    /// An empty (or whitespace-only) query returns the whole catalog.
    #[must_use]
    pub fn search(&self, text: &str) -> Vec<&Product> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return self.products.iter().collect();
        }

        if needle.chars().count() > 3 && self.faults().search_dropout.should_inject() {
            debug!(query = %needle, "Search dropout fault injected");
            return Vec::new();
        }

        self.products
            .iter()
            .filter(|product| {
                product.name.to_lowercase().contains(&needle)
                    || product.brand.to_lowercase().contains(&needle)
                    || product.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Sort `products` by `option`.
    ///
    /// Every option is a stable sort. [`SortOption::Newest`] keeps the given
    /// order unless the newest-reversal fault fires.
    #[must_use]
    pub fn sort<'a>(&self, mut products: Vec<&'a Product>, option: SortOption) -> Vec<&'a Product> {
        match option {
            SortOption::Featured => products.sort_by_key(|p| !p.is_featured),
            SortOption::PriceAsc => products.sort_by(|a, b| a.price.cmp(&b.price)),
            SortOption::PriceDesc => products.sort_by(|a, b| b.price.cmp(&a.price)),
            SortOption::RatingDesc => products.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
            SortOption::Newest => {
                if self.faults().newest_reversal.should_inject() {
                    debug!("Newest sort reversal fault injected");
                    products.reverse();
                }
            }
        }
        products
    }

    /// Run a full query: search, category, price range, sort.
    #[must_use]
    pub fn query(&self, query: &CatalogQuery) -> Vec<&Product> {
        let mut products = self.search(&query.text);
        if let Some(category) = query.category {
            products = filter_by_category(products, category);
        }
        if let Some(range) = &query.price_range {
            products = filter_by_price(products, range);
        }
        self.sort(products, query.sort)
    }
}
