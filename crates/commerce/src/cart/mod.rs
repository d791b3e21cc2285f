//! Shopping cart state.
//!
//! A [`Cart`] is an ordered list of [`CartLine`]s with at most one line per
//! product and no line below quantity one. The quantity type makes the second
//! rule structural; [`Cart`] keeps the first.
//!
//! Each line embeds the full [`Product`] it was created from, so a restored
//! cart stays displayable and priceable even if the catalog has since
//! changed. [`CartStore`] owns the live cart and persists it.

mod store;

use std::collections::HashSet;
use std::num::NonZeroU32;

use aisle_core::{LineId, Price, Product, ProductId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use store::CartStore;

/// Errors returned by cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The requested change would leave a line at a non-positive quantity,
    /// or beyond the largest supported quantity.
    #[error("invalid quantity {requested} for product {product_id}")]
    InvalidQuantity {
        product_id: ProductId,
        requested: i64,
    },
}

/// Errors found when checking a deserialized cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartIntegrityError {
    /// Two lines reference the same product.
    #[error("duplicate line for product {0}")]
    DuplicateProduct(ProductId),
    /// Two lines share a line id.
    #[error("duplicate line id {0}")]
    DuplicateLine(LineId),
}

/// One product-quantity pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: LineId,
    pub product: Product,
    pub quantity: NonZeroU32,
}

impl CartLine {
    /// Create a new line with a fresh ID.
    #[must_use]
    pub fn new(product: Product, quantity: NonZeroU32) -> Self {
        Self {
            id: LineId::generate(),
            product,
            quantity,
        }
    }

    /// The referenced product's ID.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    /// `price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity.get())
    }
}

/// The ordered set of cart lines.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from lines, checking uniqueness.
    ///
    /// # Errors
    ///
    /// Returns an error if two lines share a product or a line id.
    pub fn from_lines(lines: Vec<CartLine>) -> Result<Self, CartIntegrityError> {
        let cart = Self { lines };
        cart.check_integrity()?;
        Ok(cart)
    }

    /// Verify that product ids and line ids are unique.
    ///
    /// # Errors
    ///
    /// Returns the first duplicate found.
    pub fn check_integrity(&self) -> Result<(), CartIntegrityError> {
        let mut products = HashSet::new();
        let mut line_ids = HashSet::new();
        for line in &self.lines {
            if !products.insert(line.product_id()) {
                return Err(CartIntegrityError::DuplicateProduct(line.product_id().clone()));
            }
            if !line_ids.insert(line.id) {
                return Err(CartIntegrityError::DuplicateLine(line.id));
            }
        }
        Ok(())
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Returns true if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines (not units).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Look up a line by ID.
    #[must_use]
    pub fn line(&self, id: LineId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == id)
    }

    /// Look up the line holding `product_id`.
    #[must_use]
    pub fn line_for_product(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id() == product_id)
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity.get())).sum()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub(crate) fn line_mut(&mut self, id: LineId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| line.id == id)
    }

    pub(crate) fn line_for_product_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id() == product_id)
    }

    pub(crate) fn lines_mut(&mut self) -> impl Iterator<Item = &mut CartLine> {
        self.lines.iter_mut()
    }

    pub(crate) fn push(&mut self, line: CartLine) {
        self.lines.push(line);
    }

    pub(crate) fn remove(&mut self, id: LineId) -> Option<CartLine> {
        let index = self.lines.iter().position(|line| line.id == id)?;
        Some(self.lines.remove(index))
    }

    pub(crate) fn clear(&mut self) {
        self.lines.clear();
    }
}
