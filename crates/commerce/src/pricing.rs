//! Price derivation.
//!
//! Prices are derived from the current cart on every request and never
//! cached. The arithmetic is:
//!
//! - `subtotal = Σ price × quantity`
//! - `shipping = 0` if `subtotal > free_shipping_threshold`, else the flat fee
//! - `total = subtotal + shipping`
//!
//! A [`SurchargeFault`] may add a random amount to `total` only; subtotal and
//! shipping always match the cart.

use aisle_core::Price;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cart::Cart;
use crate::faults::{self, SharedFault};

/// Threshold-based shipping rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    /// Subtotals strictly above this ship free.
    pub free_shipping_threshold: Price,
    /// Fee charged at or below the threshold.
    pub flat_shipping_fee: Price,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Price::from_cents(5_000),
            flat_shipping_fee: Price::from_cents(999),
        }
    }
}

impl ShippingPolicy {
    /// Fee for a given subtotal.
    #[must_use]
    pub fn fee_for(&self, subtotal: Price) -> Price {
        if subtotal > self.free_shipping_threshold {
            Price::ZERO
        } else {
            self.flat_shipping_fee
        }
    }
}

/// Billing-noise fault: a random surcharge on the grand total.
#[derive(Debug, Clone)]
pub struct SurchargeFault {
    policy: SharedFault,
    min: Price,
    max: Price,
}

impl SurchargeFault {
    /// Wrap `policy` with the default surcharge range of $5.00 to $25.00.
    #[must_use]
    pub fn new(policy: SharedFault) -> Self {
        Self::with_range(policy, Price::from_cents(500), Price::from_cents(2_500))
    }

    /// Wrap `policy` with a custom range. An inverted range collapses to `min`.
    #[must_use]
    pub fn with_range(policy: SharedFault, min: Price, max: Price) -> Self {
        Self {
            policy,
            min,
            max: max.max(min),
        }
    }

    /// A fault that never fires.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(faults::disabled())
    }

    /// The surcharge for one evaluation, zero unless the policy fires.
    #[must_use]
    pub fn sample(&self) -> Price {
        if !self.policy.should_inject() {
            return Price::ZERO;
        }

        // Whole cents keep the result exact.
        let amount = Decimal::new(rand::rng().random_range(cents(self.min)..=cents(self.max)), 2);
        Price::new(amount).unwrap_or(Price::ZERO)
    }
}

/// Whole cents in `price`, clamped to `i64::MAX` for amounts too large to count.
fn cents(price: Price) -> i64 {
    price
        .amount()
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| i64::try_from(cents.trunc()).ok())
        .unwrap_or(i64::MAX)
}

/// A derived price summary for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Price,
    pub shipping_fee: Price,
    pub total: Price,
    pub item_count: u64,
    pub free_shipping_threshold: Price,
}

impl PriceBreakdown {
    /// Returns true if shipping is waived.
    #[must_use]
    pub const fn ships_free(&self) -> bool {
        self.shipping_fee.is_zero()
    }

    /// How much more the subtotal must grow before shipping is waived.
    ///
    /// Zero once shipping is already free. Because the threshold is
    /// exclusive, reaching exactly this amount is still one cent short.
    #[must_use]
    pub fn free_shipping_remaining(&self) -> Price {
        if self.ships_free() {
            return Price::ZERO;
        }
        self.free_shipping_threshold.saturating_sub(self.subtotal)
    }
}

/// Stateless price calculator with one process-wide shipping policy.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    shipping: ShippingPolicy,
    surcharge: SurchargeFault,
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(ShippingPolicy::default(), SurchargeFault::disabled())
    }
}

impl PricingEngine {
    /// Create an engine.
    #[must_use]
    pub const fn new(shipping: ShippingPolicy, surcharge: SurchargeFault) -> Self {
        Self {
            shipping,
            surcharge,
        }
    }

    /// The shipping rules in force.
    #[must_use]
    pub const fn shipping(&self) -> &ShippingPolicy {
        &self.shipping
    }

    /// Derive the price breakdown for `cart`.
    #[must_use]
    pub fn quote(&self, cart: &Cart) -> PriceBreakdown {
        let subtotal = cart.subtotal();
        let shipping_fee = self.shipping.fee_for(subtotal);
        let surcharge = self.surcharge.sample();
        if !surcharge.is_zero() {
            debug!(%surcharge, "Surcharge fault injected into total");
        }

        PriceBreakdown {
            subtotal,
            shipping_fee,
            total: subtotal + shipping_fee + surcharge,
            item_count: cart.total_quantity(),
            free_shipping_threshold: self.shipping.free_shipping_threshold,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::num::NonZeroU32;

    use aisle_core::Category;

    use super::*;
    use crate::cart::CartLine;
    use crate::catalog::tests::product;

    fn cart_of(lines: &[(u32, u32)]) -> Cart {
        Cart::from_lines(
            lines
                .iter()
                .enumerate()
                .map(|(i, (cents, qty))| {
                    CartLine::new(
                        product(&format!("p{i}"), "P", Category::Phones, *cents),
                        NonZeroU32::new(*qty).unwrap(),
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_subtotal_is_sum_of_line_totals() {
        let engine = PricingEngine::default();
        let quote = engine.quote(&cart_of(&[(1_999, 2), (500, 3)]));
        assert_eq!(quote.subtotal, Price::from_cents(5_498));
        assert_eq!(quote.item_count, 5);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let engine = PricingEngine::default();

        let at = engine.quote(&cart_of(&[(5_000, 1)]));
        assert_eq!(at.shipping_fee, Price::from_cents(999));
        assert_eq!(at.total, Price::from_cents(5_999));

        let above = engine.quote(&cart_of(&[(5_100, 1)]));
        assert_eq!(above.shipping_fee, Price::ZERO);
        assert_eq!(above.total, Price::from_cents(5_100));
    }

    #[test]
    fn test_empty_cart_pays_flat_fee() {
        let quote = PricingEngine::default().quote(&Cart::new());
        assert_eq!(quote.subtotal, Price::ZERO);
        assert_eq!(quote.total, Price::from_cents(999));
    }

    #[test]
    fn test_free_shipping_remaining() {
        let engine = PricingEngine::default();
        let quote = engine.quote(&cart_of(&[(3_250, 1)]));
        assert_eq!(quote.free_shipping_remaining(), Price::from_cents(1_750));

        let quote = engine.quote(&cart_of(&[(9_999, 1)]));
        assert!(quote.ships_free());
        assert_eq!(quote.free_shipping_remaining(), Price::ZERO);
    }

    #[test]
    fn test_custom_policy() {
        let engine = PricingEngine::new(
            ShippingPolicy {
                free_shipping_threshold: Price::from_cents(10_000),
                flat_shipping_fee: Price::from_cents(1_500),
            },
            SurchargeFault::disabled(),
        );
        let quote = engine.quote(&cart_of(&[(6_000, 1)]));
        assert_eq!(quote.shipping_fee, Price::from_cents(1_500));
    }

    #[test]
    fn test_disabled_surcharge_is_deterministic() {
        let engine = PricingEngine::default();
        let cart = cart_of(&[(1_234, 3)]);
        let first = engine.quote(&cart);
        for _ in 0..500 {
            assert_eq!(engine.quote(&cart), first);
        }
    }

    #[test]
    fn test_surcharge_only_touches_total() {
        let engine = PricingEngine::new(
            ShippingPolicy::default(),
            SurchargeFault::new(faults::always()),
        );
        let cart = cart_of(&[(2_000, 1)]);
        for _ in 0..200 {
            let quote = engine.quote(&cart);
            assert_eq!(quote.subtotal, Price::from_cents(2_000));
            assert_eq!(quote.shipping_fee, Price::from_cents(999));

            let surcharge = quote.total.saturating_sub(quote.subtotal + quote.shipping_fee);
            assert!(surcharge >= Price::from_cents(500), "surcharge {surcharge}");
            assert!(surcharge <= Price::from_cents(2_500), "surcharge {surcharge}");
        }
    }

    #[test]
    fn test_surcharge_with_unbounded_range() {
        let fault =
            SurchargeFault::with_range(faults::always(), Price::from_cents(500), Price::MAX);
        for _ in 0..100 {
            assert!(fault.sample() >= Price::from_cents(500));
        }
    }

    #[test]
    fn test_oversized_line_saturates_instead_of_panicking() {
        let huge = Price::new(Decimal::from_str_exact("100000000000000000000").unwrap()).unwrap();
        let mut expensive = product("big", "Vault", Category::Tvs, 0);
        expensive.price = huge;
        let cart = Cart::from_lines(vec![
            CartLine::new(expensive, NonZeroU32::new(1_000_000_000).unwrap()),
            CartLine::new(
                product("small", "Cable", Category::Tvs, 500),
                NonZeroU32::new(1).unwrap(),
            ),
        ])
        .unwrap();

        let quote = PricingEngine::new(
            ShippingPolicy::default(),
            SurchargeFault::new(faults::always()),
        )
        .quote(&cart);
        assert_eq!(quote.subtotal, Price::MAX);
        assert_eq!(quote.total, Price::MAX);
    }
}
