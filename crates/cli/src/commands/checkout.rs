//! Checkout command.

use std::time::Duration;

use aisle_commerce::Session;
use aisle_core::{PaymentMethod, ShippingAddress};
use tracing::info;

use super::log_breakdown;

/// Walk Address, Payment, and Summary, then place the order.
///
/// `delay` is slept between starting and completing placement.
///
/// # Errors
///
/// Returns an error if the address is incomplete, the cart is empty, or
/// placement fails. A failed placement leaves the cart as it was.
pub async fn run(
    session: &mut Session,
    address: ShippingAddress,
    payment: PaymentMethod,
    delay: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let checkout = session.checkout_mut();
    checkout.set_address(address)?;
    let step = checkout.advance()?;
    info!(step = step.title(), "Address accepted");

    checkout.set_payment_method(payment)?;
    let step = checkout.advance()?;
    info!(step = step.title(), payment = payment.label(), "Payment method selected");

    log_breakdown(&session.quote());

    session.begin_placement()?;
    if !delay.is_zero() {
        info!(delay = ?delay, "Processing order");
        tokio::time::sleep(delay).await;
    }
    let order = session.complete_placement()?;

    info!(
        order_number = %order.number(),
        total = %order.total(),
        payment = order.payment_method().label(),
        ship_to = %order.shipping_address(),
        estimated_delivery = %order.estimated_delivery().format("%B %-d, %Y"),
        "Order confirmed"
    );
    Ok(())
}
