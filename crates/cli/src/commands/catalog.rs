//! Catalog browsing.

use aisle_commerce::{CatalogQuery, CommerceError, PriceRange, Session};
use aisle_core::{Category, Price, Product, ProductId, SortOption};
use rust_decimal::Decimal;
use tracing::info;

/// Filters shared by `catalog list` and `catalog search`.
pub struct QueryArgs {
    pub category: Option<Category>,
    pub sort: SortOption,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl QueryArgs {
    fn price_range(&self) -> Result<Option<PriceRange>, CommerceError> {
        if self.min_price.is_none() && self.max_price.is_none() {
            return Ok(None);
        }
        let min = Price::new(self.min_price.unwrap_or(Decimal::ZERO))?;
        let max = Price::new(self.max_price.unwrap_or(Decimal::MAX))?;
        Ok(Some(PriceRange::new(min, max)?))
    }
}

/// List products matching `text` and the filters.
///
/// # Errors
///
/// Returns an error if the price bounds are negative or inverted.
pub fn list(
    session: &Session,
    text: &str,
    args: &QueryArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let query = CatalogQuery {
        text: text.to_string(),
        category: args.category,
        price_range: args.price_range()?,
        sort: args.sort,
    };

    let products = session.catalog().query(&query);
    for product in &products {
        info!(
            id = %product.id,
            name = %product.name,
            brand = %product.brand,
            category = %product.category,
            price = %product.price,
            rating = product.rating,
            in_stock = product.in_stock,
            "Product"
        );
    }
    info!(
        count = products.len(),
        total = session.catalog().len(),
        sort = %args.sort,
        "Products listed"
    );
    Ok(())
}

/// Show one product in full.
///
/// # Errors
///
/// Returns an error if the product is not in the catalog.
pub fn show(session: &Session, id: &ProductId) -> Result<(), Box<dyn std::error::Error>> {
    let product = session
        .catalog()
        .get(id)
        .ok_or_else(|| CommerceError::ProductNotFound(id.clone()))?;
    log_product(product);
    Ok(())
}

fn log_product(product: &Product) {
    info!(
        id = %product.id,
        name = %product.name,
        brand = %product.brand,
        category = %product.category,
        price = %product.price,
        rating = product.rating,
        reviews = product.review_count,
        in_stock = product.in_stock,
        "Product"
    );
    info!(description = %product.description);
    if let Some(savings) = product.savings() {
        info!(%savings, "On sale");
    }
    for (name, value) in &product.specifications {
        info!(%name, %value, "Specification");
    }
    for review in &product.reviews {
        info!(
            author = %review.author,
            rating = review.rating,
            title = %review.title,
            "Review"
        );
    }
}
