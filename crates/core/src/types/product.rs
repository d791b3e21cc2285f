//! Catalog product records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::id::{ProductId, ReviewId};
use super::price::Price;
use super::status::Category;

/// Errors that can occur when validating a [`Product`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    /// The product ID is empty.
    #[error("product id cannot be empty")]
    EmptyId,
    /// The original price is lower than the current price.
    #[error("original price {original} is below price {price}")]
    OriginalBelowPrice {
        /// Current selling price.
        price: Price,
        /// Claimed original price.
        original: Price,
    },
    /// The rating is outside 0..=5 or not a number.
    #[error("rating must be between 0 and 5")]
    RatingOutOfRange,
}

/// A customer review attached to a product. Display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub author: String,
    pub rating: u8,
    pub title: String,
    pub comment: String,
    pub date: String,
}

/// A product as supplied by the catalog feed.
///
/// Products are immutable once loaded into a catalog for the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub category: Category,
    pub description: String,
    #[serde(default, rename = "imageURL")]
    pub image_url: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Price>,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
    pub in_stock: bool,
    #[serde(default)]
    pub is_featured: bool,
}

impl Product {
    /// Check the invariants a catalog relies on.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty, the original price is below the
    /// selling price, or the rating is outside 0..=5.
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.id.as_str().trim().is_empty() {
            return Err(ProductError::EmptyId);
        }

        if let Some(original) = self.original_price.filter(|o| *o < self.price) {
            return Err(ProductError::OriginalBelowPrice {
                price: self.price,
                original,
            });
        }

        if !(0.0..=5.0).contains(&self.rating) {
            return Err(ProductError::RatingOutOfRange);
        }

        Ok(())
    }

    /// Returns true if an original price above the current price is set.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.original_price.is_some_and(|original| original > self.price)
    }

    /// Amount saved against the original price, if discounted.
    #[must_use]
    pub fn savings(&self) -> Option<Price> {
        self.original_price
            .filter(|original| *original > self.price)
            .map(|original| original.saturating_sub(self.price))
    }
}
