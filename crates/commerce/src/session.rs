//! One shopper's session.
//!
//! A [`Session`] owns every piece of mutable state for one cart: the
//! [`CartStore`], the [`CheckoutFlow`], and the [`OrderHistory`]. The catalog
//! is shared read-only. Nothing here is global, so any number of sessions can
//! live in one process.
//!
//! Operations on a session run one at a time. Hosts that dispatch from
//! several threads wrap it in a [`SharedSession`], which turns overlapping
//! access into [`CommerceError::Busy`] instead of blocking.

use std::sync::{Arc, Mutex, TryLockError};

use aisle_core::{LineId, ProductId};
use tracing::{error, instrument, warn};

use crate::cart::{CartLine, CartStore};
use crate::catalog::Catalog;
use crate::checkout::{CheckoutFlow, PlacementContext};
use crate::config::CommerceConfig;
use crate::error::{CommerceError, Result};
use crate::order::{Order, OrderHistory, OrderNumberGenerator};
use crate::pricing::{PriceBreakdown, PricingEngine};
use crate::storage::KeyValueStore;

/// A shopper's cart, checkout, and order history.
#[derive(Debug)]
pub struct Session {
    catalog: Arc<Catalog>,
    cart: CartStore,
    checkout: CheckoutFlow,
    pricing: PricingEngine,
    numbers: OrderNumberGenerator,
    history: OrderHistory,
}

impl Session {
    /// Assemble a session, restoring the cart and order history from `storage`.
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        storage: Arc<dyn KeyValueStore>,
        pricing: PricingEngine,
        numbers: OrderNumberGenerator,
    ) -> Self {
        let cart = CartStore::open(storage.clone());
        let history = OrderHistory::open(storage);
        for order in history.orders() {
            numbers.observe(order.number());
        }

        Self {
            catalog,
            cart,
            checkout: CheckoutFlow::new(),
            pricing,
            numbers,
            history,
        }
    }

    /// Open a file-backed session as described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Storage`] if the data directory cannot be opened.
    pub fn open(config: &CommerceConfig) -> Result<Self> {
        let storage = config.open_storage()?;
        Ok(Self::new(
            Arc::new(config.load_catalog()),
            Arc::new(storage),
            config.pricing_engine(),
            config.order_number_generator(),
        ))
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    #[must_use]
    pub const fn checkout(&self) -> &CheckoutFlow {
        &self.checkout
    }

    /// The checkout flow, for editing the address and payment method and
    /// moving between steps.
    pub fn checkout_mut(&mut self) -> &mut CheckoutFlow {
        &mut self.checkout
    }

    #[must_use]
    pub const fn history(&self) -> &OrderHistory {
        &self.history
    }

    #[must_use]
    pub const fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    /// Price the current cart.
    #[must_use]
    pub fn quote(&self) -> PriceBreakdown {
        self.pricing.quote(self.cart.cart())
    }

    /// Add `quantity` units of a catalog product to the cart.
    ///
    /// # Errors
    ///
    /// - [`CommerceError::ProductNotFound`] if the catalog has no such product
    /// - [`CommerceError::Cart`] if the resulting quantity is invalid
    #[instrument(skip(self))]
    pub fn add_to_cart(&mut self, product_id: &ProductId, quantity: i64) -> Result<LineId> {
        let product = self
            .catalog
            .get(product_id)
            .ok_or_else(|| CommerceError::ProductNotFound(product_id.clone()))?;
        Ok(self.cart.add(product, quantity)?)
    }

    /// Remove a cart line. Unknown lines are ignored.
    #[instrument(skip(self))]
    pub fn remove_line(&mut self, line_id: LineId) -> Option<CartLine> {
        self.cart.remove(line_id)
    }

    /// Set a cart line's quantity; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Cart`] if `quantity` is too large.
    #[instrument(skip(self))]
    pub fn set_quantity(&mut self, line_id: LineId, quantity: i64) -> Result<()> {
        Ok(self.cart.set_quantity(line_id, quantity)?)
    }

    /// Empty the cart.
    #[instrument(skip(self))]
    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    /// Refresh cart lines with the catalog's current product data.
    pub fn refresh_cart(&mut self) -> usize {
        self.cart.refresh_products(&self.catalog)
    }

    /// Start placing the order. See [`CheckoutFlow::begin_placement`].
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Checkout`] if the flow is not at the summary
    /// step, is already placing, or the cart is empty.
    #[instrument(skip(self))]
    pub fn begin_placement(&mut self) -> Result<()> {
        Ok(self.checkout.begin_placement(&self.cart)?)
    }

    /// Finish placing the order and record it in the history.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Checkout`] if placement has not begun, the
    /// cart changed, or the issued order number is already in the history.
    /// The cart is untouched on error.
    #[instrument(skip(self))]
    pub fn complete_placement(&mut self) -> Result<Order> {
        let context = PlacementContext {
            pricing: &self.pricing,
            numbers: &self.numbers,
            history: &self.history,
        };
        let order = self.checkout.complete_placement(&mut self.cart, context)?;
        if let Err(e) = self.history.record(order.clone()) {
            error!(error = %e, "Placed order could not be added to the history");
        }
        Ok(order)
    }

    /// Abandon an in-progress placement.
    pub fn abort_placement(&mut self) {
        self.checkout.abort_placement();
    }

    /// Place the order in one call.
    ///
    /// Once placed, further calls return the same order.
    ///
    /// # Errors
    ///
    /// See [`begin_placement`](Self::begin_placement) and
    /// [`complete_placement`](Self::complete_placement).
    #[instrument(skip(self))]
    pub fn place_order(&mut self) -> Result<Order> {
        if let Some(order) = self.checkout.order() {
            return Ok(order.clone());
        }
        self.begin_placement()?;
        self.complete_placement()
    }

    /// Start a new checkout after an order was placed.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Checkout`] unless an order has been placed.
    pub fn start_new_checkout(&mut self) -> Result<()> {
        Ok(self.checkout.restart()?)
    }
}

/// A [`Session`] shared between threads.
///
/// Each call to [`try_with`](Self::try_with) holds the session for the
/// duration of one closure. A call that finds the session held fails with
/// [`CommerceError::Busy`].
#[derive(Debug, Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Run `f` with exclusive access to the session.
    ///
    /// # Errors
    ///
    /// - [`CommerceError::Busy`] if another call holds the session
    /// - [`CommerceError::Poisoned`] if a previous call panicked
    /// - whatever `f` returns
    pub fn try_with<T>(&self, f: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let mut session = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                warn!("Rejected concurrent session access");
                return Err(CommerceError::Busy);
            }
            Err(TryLockError::Poisoned(_)) => return Err(CommerceError::Poisoned),
        };
        f(&mut session)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aisle_core::{AddressPreset, Category, OrderNumber, Price, ShippingAddress};

    use super::*;
    use crate::catalog::QueryFaults;
    use crate::catalog::tests::product;
    use crate::checkout::{CheckoutError, CheckoutStep};
    use crate::faults;
    use crate::order::SystemClock;
    use crate::storage::MemoryStore;

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::from_products(
            vec![
                product("1", "UltraBook Pro", Category::Laptops, 129_999),
                product("2", "Smart Plug", Category::SmartHome, 1_999),
            ],
            QueryFaults::default(),
        ))
    }

    fn session_with(storage: Arc<MemoryStore>, numbers: OrderNumberGenerator) -> Session {
        Session::new(catalog(), storage, PricingEngine::default(), numbers)
    }

    fn to_summary(session: &mut Session) {
        let checkout = session.checkout_mut();
        checkout
            .set_address(ShippingAddress::preset(AddressPreset::Home))
            .unwrap();
        checkout.advance().unwrap();
        checkout.advance().unwrap();
    }

    #[test]
    fn test_add_unknown_product() {
        let mut session =
            session_with(Arc::new(MemoryStore::new()), OrderNumberGenerator::default());
        let result = session.add_to_cart(&ProductId::new("nope"), 1);
        assert!(matches!(result, Err(CommerceError::ProductNotFound(_))));
    }

    #[test]
    fn test_place_order_records_history() {
        let storage = Arc::new(MemoryStore::new());
        let mut session = session_with(storage.clone(), OrderNumberGenerator::default());
        session.add_to_cart(&ProductId::new("2"), 2).unwrap();
        to_summary(&mut session);

        let expected_total = session.quote().total;
        let order = session.place_order().unwrap();
        assert_eq!(order.total(), expected_total);
        assert_eq!(order.total(), Price::from_cents(4_997));
        assert!(session.cart().is_empty());
        assert!(session.history().contains(order.number()));

        let again = session.place_order().unwrap();
        assert_eq!(again, order);
        assert_eq!(session.history().orders().len(), 1);

        let reopened = session_with(storage, OrderNumberGenerator::default());
        assert!(reopened.cart().is_empty());
        assert_eq!(reopened.history().orders().len(), 1);
    }

    #[test]
    fn test_duplicate_order_number_aborts_placement() {
        let storage = Arc::new(MemoryStore::new());
        let colliding = || OrderNumberGenerator::new(Arc::new(SystemClock), faults::always());

        let mut first = session_with(storage.clone(), colliding());
        first.add_to_cart(&ProductId::new("1"), 1).unwrap();
        to_summary(&mut first);
        assert_eq!(first.place_order().unwrap().number(), &OrderNumber::collision());

        let mut second = session_with(storage, colliding());
        second.add_to_cart(&ProductId::new("2"), 1).unwrap();
        to_summary(&mut second);
        let result = second.place_order();
        assert!(matches!(
            result,
            Err(CommerceError::Checkout(CheckoutError::DuplicateOrderNumber(_)))
        ));
        assert_eq!(second.checkout().step(), CheckoutStep::Summary);
        assert_eq!(second.cart().lines().len(), 1);
        assert_eq!(second.history().orders().len(), 1);
    }

    #[test]
    fn test_new_session_resumes_order_numbers() {
        let storage = Arc::new(MemoryStore::new());
        let mut first = session_with(storage.clone(), OrderNumberGenerator::default());
        first.add_to_cart(&ProductId::new("2"), 1).unwrap();
        to_summary(&mut first);
        let placed = first.place_order().unwrap();

        let mut second = session_with(storage, OrderNumberGenerator::default());
        second.add_to_cart(&ProductId::new("2"), 1).unwrap();
        to_summary(&mut second);
        let next = second.place_order().unwrap();
        assert_ne!(next.number(), placed.number());
    }

    #[test]
    fn test_start_new_checkout_after_placement() {
        let mut session =
            session_with(Arc::new(MemoryStore::new()), OrderNumberGenerator::default());
        session.add_to_cart(&ProductId::new("1"), 1).unwrap();
        to_summary(&mut session);
        session.place_order().unwrap();

        session.start_new_checkout().unwrap();
        assert_eq!(session.checkout().step(), CheckoutStep::Address);
        assert!(session.checkout().order().is_none());
    }

    #[test]
    fn test_shared_session_rejects_overlapping_access() {
        let shared = SharedSession::new(session_with(
            Arc::new(MemoryStore::new()),
            OrderNumberGenerator::default(),
        ));
        let other = shared.clone();

        let inner = shared
            .try_with(|session| {
                session.add_to_cart(&ProductId::new("1"), 1)?;
                Ok(other.try_with(|_| Ok(())))
            })
            .unwrap();
        assert!(matches!(inner, Err(CommerceError::Busy)));

        let lines = shared.try_with(|session| Ok(session.cart().lines().len())).unwrap();
        assert_eq!(lines, 1);
    }
}
