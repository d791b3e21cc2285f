//! Subcommand implementations.
//!
//! Results are reported through `tracing` at info level, like every other
//! log line, so they share one output format.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

use aisle_commerce::PriceBreakdown;
use tracing::info;

/// Log a price breakdown.
fn log_breakdown(breakdown: &PriceBreakdown) {
    info!(
        items = breakdown.item_count,
        subtotal = %breakdown.subtotal,
        shipping = %breakdown.shipping_fee,
        total = %breakdown.total,
        "Totals"
    );
    if !breakdown.ships_free() {
        info!(
            remaining = %breakdown.free_shipping_remaining(),
            threshold = %breakdown.free_shipping_threshold,
            "Spend more than the threshold for free shipping"
        );
    }
}
