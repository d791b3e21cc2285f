//! Order history command.

use aisle_commerce::Session;
use tracing::info;

/// List placed orders, oldest first.
pub fn list(session: &Session) {
    let orders = session.history().orders();
    if orders.is_empty() {
        info!("No orders yet");
        return;
    }

    for order in orders {
        info!(
            order_number = %order.number(),
            placed_at = %order.placed_at().format("%Y-%m-%d %H:%M"),
            status = %order.status(),
            items = order.breakdown().item_count,
            total = %order.total(),
            "Order"
        );
    }
}
