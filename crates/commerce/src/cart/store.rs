//! The live cart and its persistence.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

use aisle_core::{LineId, Product, ProductId};
use tracing::{debug, error, warn};

use super::{Cart, CartError, CartLine};
use crate::catalog::Catalog;
use crate::storage::{self, CART_STORAGE_KEY, KeyValueStore, PersistenceError};

/// Owns the session's cart.
///
/// Every mutation that changes the cart writes the full cart to the
/// [`CART_STORAGE_KEY`] slot before returning. A failed write is logged and
/// the in-memory change stands.
pub struct CartStore {
    cart: Cart,
    storage: Arc<dyn KeyValueStore>,
    revision: u64,
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("cart", &self.cart)
            .field("storage", &"[dyn KeyValueStore]")
            .field("revision", &self.revision)
            .finish()
    }
}

impl CartStore {
    /// Open the store, restoring the cart from `storage`.
    ///
    /// An absent, blank, unparsable, or inconsistent slot yields an empty cart.
    #[must_use]
    pub fn open(storage: Arc<dyn KeyValueStore>) -> Self {
        let cart = restore(storage.as_ref());
        Self {
            cart,
            storage,
            revision: 0,
        }
    }

    /// The current cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// An owned copy of the current cart.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.cart.clone()
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    /// Look up a line by ID.
    #[must_use]
    pub fn line(&self, id: LineId) -> Option<&CartLine> {
        self.cart.line(id)
    }

    /// Look up the line holding `product_id`.
    #[must_use]
    pub fn line_for_product(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.cart.line_for_product(product_id)
    }

    /// Returns true if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    /// Sum of all line quantities, for badges and summaries.
    #[must_use]
    pub fn subtotal_quantity(&self) -> u64 {
        self.cart.total_quantity()
    }

    /// Counter bumped by every change to the cart since the store was opened.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Add `quantity` units of `product`.
    ///
    /// Increments the existing line for the product, or appends a new one.
    /// Returns the ID of the affected line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if the resulting quantity would
    /// be zero, negative, larger than `u32::MAX`, or large enough that the line
    /// total overflows. The cart is unchanged.
    pub fn add(&mut self, product: &Product, quantity: i64) -> Result<LineId, CartError> {
        let current = self
            .cart
            .line_for_product(&product.id)
            .map_or(0, |line| i64::from(line.quantity.get()));
        let resulting = current
            .checked_add(quantity)
            .and_then(|value| quantity_for(product, value))
            .ok_or_else(|| CartError::InvalidQuantity {
                product_id: product.id.clone(),
                requested: quantity,
            })?;

        let line_id = if let Some(line) = self.cart.line_for_product_mut(&product.id) {
            line.quantity = resulting;
            line.id
        } else {
            let line = CartLine::new(product.clone(), resulting);
            let id = line.id;
            self.cart.push(line);
            id
        };

        debug!(product_id = %product.id, %line_id, quantity = resulting.get(), "Cart line added");
        self.commit();
        Ok(line_id)
    }

    /// Add one unit of `product`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if the line is already at `u32::MAX`.
    pub fn add_one(&mut self, product: &Product) -> Result<LineId, CartError> {
        self.add(product, 1)
    }

    /// Remove a line. Removing a line that does not exist is a no-op.
    ///
    /// Returns the removed line, if there was one.
    pub fn remove(&mut self, line_id: LineId) -> Option<CartLine> {
        let removed = self.cart.remove(line_id)?;
        debug!(%line_id, product_id = %removed.product.id, "Cart line removed");
        self.commit();
        Some(removed)
    }

    /// Set a line's quantity. A quantity of zero or less removes the line.
    ///
    /// Unknown line IDs are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if `quantity` exceeds `u32::MAX`
    /// or the line total would overflow.
    pub fn set_quantity(&mut self, line_id: LineId, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            self.remove(line_id);
            return Ok(());
        }

        let Some(line) = self.cart.line_mut(line_id) else {
            return Ok(());
        };
        let new_quantity =
            quantity_for(&line.product, quantity).ok_or_else(|| CartError::InvalidQuantity {
                product_id: line.product.id.clone(),
                requested: quantity,
            })?;
        if line.quantity == new_quantity {
            return Ok(());
        }
        line.quantity = new_quantity;

        debug!(%line_id, quantity, "Cart line quantity set");
        self.commit();
        Ok(())
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.cart.clear();
        debug!("Cart cleared");
        self.commit();
    }

    /// Replace embedded product data with the catalog's current records.
    ///
    /// Lines whose product is no longer in the catalog keep their snapshot.
    /// Returns the number of lines whose product data changed.
    pub fn refresh_products(&mut self, catalog: &Catalog) -> usize {
        let mut refreshed = 0;
        for line in self.cart.lines_mut() {
            let current = catalog
                .get(&line.product.id)
                .filter(|current| **current != line.product);
            if let Some(current) = current {
                line.product = current.clone();
                refreshed += 1;
            }
        }

        if refreshed > 0 {
            debug!(refreshed, "Cart products refreshed from catalog");
            self.commit();
        }
        refreshed
    }

    fn commit(&mut self) {
        self.revision += 1;
        let saved = storage::save_document(self.storage.as_ref(), CART_STORAGE_KEY, &self.cart);
        if let Err(e) = saved {
            error!(error = %e, "Cart persistence failed, keeping in-memory cart");
        }
    }
}

fn quantity_for(product: &Product, value: i64) -> Option<NonZeroU32> {
    u32::try_from(value)
        .ok()
        .and_then(NonZeroU32::new)
        .filter(|quantity| product.price.checked_times(quantity.get()).is_some())
}

fn restore(storage: &dyn KeyValueStore) -> Cart {
    let loaded = storage::load_document::<Cart>(storage, CART_STORAGE_KEY).and_then(|cart| {
        let Some(cart) = cart else {
            return Ok(Cart::new());
        };
        cart.check_integrity()
            .map_err(|e| PersistenceError::LoadFailed {
                key: CART_STORAGE_KEY,
                reason: e.to_string(),
            })?;
        Ok(cart)
    });

    match loaded {
        Ok(cart) => {
            debug!(lines = cart.len(), "Cart restored");
            cart
        }
        Err(e) => {
            warn!(error = %e, "Cart restore failed, starting with an empty cart");
            Cart::new()
        }
    }
}
