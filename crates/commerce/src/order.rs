//! Orders, order numbers, and order history.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use aisle_core::{OrderNumber, OrderStatus, PaymentMethod, Price, ShippingAddress};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::cart::Cart;
use crate::faults::{self, SharedFault};
use crate::pricing::PriceBreakdown;
use crate::storage::{self, KeyValueStore, ORDER_HISTORY_KEY};

/// Days between placement and the estimated delivery date.
const DELIVERY_ESTIMATE_DAYS: i64 = 3;

/// Errors raised by order bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// An order with this number has already been recorded.
    #[error("duplicate order number {0}")]
    DuplicateOrderNumber(OrderNumber),
}

// =============================================================================
// Clock
// =============================================================================

/// Source of the current time.
pub trait Clock: fmt::Debug + Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// =============================================================================
// Order number generator
// =============================================================================

/// Issues order numbers from a millisecond clock.
///
/// Each number's numeric part is `max(now_ms, previous + 1)`, so numbers from
/// one generator strictly increase even if the clock stalls or steps back.
/// The collision fault replaces a fresh number with
/// [`OrderNumber::COLLISION`].
#[derive(Debug)]
pub struct OrderNumberGenerator {
    clock: Arc<dyn Clock>,
    last: AtomicU64,
    collision: SharedFault,
}

impl Default for OrderNumberGenerator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), faults::disabled())
    }
}

impl OrderNumberGenerator {
    /// Create a generator.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, collision: SharedFault) -> Self {
        Self {
            clock,
            last: AtomicU64::new(0),
            collision,
        }
    }

    /// The clock used for numbers and placement timestamps.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Make sure future numbers sort after `number`.
    ///
    /// Used to resume after numbers issued by an earlier process.
    pub fn observe(&self, number: &OrderNumber) {
        let Some(value) = number
            .as_str()
            .strip_prefix(OrderNumber::PREFIX)
            .and_then(|digits| digits.parse::<u64>().ok())
        else {
            return;
        };
        self.last.fetch_max(value, Ordering::SeqCst);
    }

    /// Issue the next order number.
    pub fn generate(&self) -> OrderNumber {
        if self.collision.should_inject() {
            warn!(order_number = OrderNumber::COLLISION, "Order number collision fault injected");
            return OrderNumber::collision();
        }

        let now = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        let next = |last: u64| now.max(last.saturating_add(1));
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(next(last)))
            .unwrap_or_else(|last| last);
        OrderNumber::from_sequence(next(previous))
    }
}

// =============================================================================
// Order
// =============================================================================

/// A placed order. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    number: OrderNumber,
    items: Cart,
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
    breakdown: PriceBreakdown,
    placed_at: DateTime<Utc>,
    status: OrderStatus,
}

impl Order {
    pub(crate) const fn new(
        number: OrderNumber,
        items: Cart,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        breakdown: PriceBreakdown,
        placed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            number,
            items,
            shipping_address,
            payment_method,
            breakdown,
            placed_at,
            status: OrderStatus::Placed,
        }
    }

    #[must_use]
    pub const fn number(&self) -> &OrderNumber {
        &self.number
    }

    /// The cart as it was when the order was placed.
    #[must_use]
    pub const fn items(&self) -> &Cart {
        &self.items
    }

    #[must_use]
    pub const fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    #[must_use]
    pub const fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    /// The price breakdown charged for the order.
    #[must_use]
    pub const fn breakdown(&self) -> &PriceBreakdown {
        &self.breakdown
    }

    /// The grand total charged.
    #[must_use]
    pub const fn total(&self) -> Price {
        self.breakdown.total
    }

    #[must_use]
    pub const fn placed_at(&self) -> DateTime<Utc> {
        self.placed_at
    }

    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Estimated delivery: three days after placement.
    #[must_use]
    pub fn estimated_delivery(&self) -> DateTime<Utc> {
        self.placed_at + Duration::days(DELIVERY_ESTIMATE_DAYS)
    }
}

// =============================================================================
// Order history
// =============================================================================

/// Orders placed on this device, persisted in the [`ORDER_HISTORY_KEY`] slot.
pub struct OrderHistory {
    orders: Vec<Order>,
    storage: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for OrderHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderHistory")
            .field("orders", &self.orders.len())
            .field("storage", &"[dyn KeyValueStore]")
            .finish()
    }
}

impl OrderHistory {
    /// Open the history, restoring it from `storage`.
    ///
    /// Load failures are logged and yield an empty history.
    #[must_use]
    pub fn open(storage: Arc<dyn KeyValueStore>) -> Self {
        let loaded = storage::load_document::<Vec<Order>>(storage.as_ref(), ORDER_HISTORY_KEY);
        let orders = match loaded {
            Ok(orders) => orders.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Order history restore failed, starting empty");
                Vec::new()
            }
        };
        Self { orders, storage }
    }

    /// Orders, oldest first.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Returns true if an order with `number` has been recorded.
    #[must_use]
    pub fn contains(&self, number: &OrderNumber) -> bool {
        self.orders.iter().any(|order| order.number() == number)
    }

    /// Look up an order by number.
    #[must_use]
    pub fn get(&self, number: &OrderNumber) -> Option<&Order> {
        self.orders.iter().find(|order| order.number() == number)
    }

    /// Record a newly placed order and persist the history.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::DuplicateOrderNumber`] if the number is taken.
    pub fn record(&mut self, order: Order) -> Result<(), OrderError> {
        if self.contains(order.number()) {
            return Err(OrderError::DuplicateOrderNumber(order.number().clone()));
        }

        debug!(order_number = %order.number(), "Order recorded");
        self.orders.push(order);
        let saved = storage::save_document(self.storage.as_ref(), ORDER_HISTORY_KEY, &self.orders);
        if let Err(e) = saved {
            error!(error = %e, "Order history persistence failed, keeping in-memory history");
        }
        Ok(())
    }
}
