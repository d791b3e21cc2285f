//! Cart commands.

use aisle_commerce::Session;
use aisle_core::{LineId, ProductId};
use tracing::info;

use super::log_breakdown;

/// Show every line and the current totals.
pub fn show(session: &Session) {
    if session.cart().is_empty() {
        info!("Cart is empty");
        return;
    }

    for line in session.cart().lines() {
        info!(
            line_id = %line.id,
            product_id = %line.product.id,
            name = %line.product.name,
            unit_price = %line.product.price,
            quantity = line.quantity.get(),
            line_total = %line.line_total(),
            "Cart line"
        );
    }
    log_breakdown(&session.quote());
}

/// Add units of a product.
///
/// # Errors
///
/// Returns an error if the product is unknown or the quantity is invalid.
pub fn add(
    session: &mut Session,
    product_id: &ProductId,
    quantity: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let line_id = session.add_to_cart(product_id, quantity)?;
    let units = session
        .cart()
        .line(line_id)
        .map_or(0, |line| line.quantity.get());
    info!(%line_id, %product_id, quantity = units, "Added to cart");
    show(session);
    Ok(())
}

/// Remove a line.
pub fn remove(session: &mut Session, line_id: LineId) {
    match session.remove_line(line_id) {
        Some(line) => info!(%line_id, name = %line.product.name, "Removed from cart"),
        None => info!(%line_id, "No such cart line"),
    }
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns an error if the quantity is too large.
pub fn set(
    session: &mut Session,
    line_id: LineId,
    quantity: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    session.set_quantity(line_id, quantity)?;
    show(session);
    Ok(())
}

/// Empty the cart.
pub fn clear(session: &mut Session) {
    session.clear_cart();
    info!("Cart cleared");
}

/// Refresh product data on every line.
pub fn refresh(session: &mut Session) {
    let refreshed = session.refresh_cart();
    info!(refreshed, "Cart refreshed from catalog");
}
