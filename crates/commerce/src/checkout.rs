//! The checkout state machine.
//!
//! ```text
//! Address (1) <-> Payment (2) <-> Summary (3) --place--> Placing --> Placed
//!                                     ^                     |
//!                                     +-------abort---------+
//! ```
//!
//! Only adjacent steps are reachable through [`CheckoutFlow::advance`] and
//! [`CheckoutFlow::retreat`]. Placement runs in two phases so the caller can
//! put a processing delay between them: [`CheckoutFlow::begin_placement`]
//! locks the flow in `Placing`, and [`CheckoutFlow::complete_placement`]
//! prices the cart, issues an order number, builds the [`Order`], and clears
//! the cart. Every fallible step happens before the cart is touched, so a
//! failure leaves no order and an unchanged cart.

use std::fmt;

use aisle_core::{AddressField, OrderNumber, PaymentMethod, ShippingAddress};
use thiserror::Error;
use tracing::{debug, info};

use crate::cart::CartStore;
use crate::order::{Order, OrderHistory, OrderNumberGenerator};
use crate::pricing::PricingEngine;

/// Errors returned by checkout transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// The current step has required fields left empty.
    #[error("missing required fields: {}", join_fields(missing))]
    StepInvalid { missing: Vec<AddressField> },

    /// Retreat was requested from the first step.
    #[error("already at the first checkout step")]
    NoPreviousStep,

    /// An order is being placed.
    #[error("an order is already being placed")]
    OrderInProgress,

    /// The action is not available from the current step.
    #[error("cannot {action} from the {step} step")]
    InvalidTransition {
        step: CheckoutStep,
        action: &'static str,
    },

    /// Checkout was attempted with nothing in the cart.
    #[error("cannot place an order for an empty cart")]
    EmptyCart,

    /// The cart was modified while the order was being placed.
    #[error("the cart changed while the order was being placed")]
    CartChanged,

    /// The issued order number belongs to an existing order.
    #[error("order number {0} is already in use")]
    DuplicateOrderNumber(OrderNumber),
}

fn join_fields(fields: &[AddressField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Where the flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckoutStep {
    #[default]
    Address,
    Payment,
    Summary,
    /// Placement has begun and not yet completed.
    Placing,
    /// Terminal.
    Placed,
}

impl CheckoutStep {
    /// The step's position in the visible progress indicator.
    ///
    /// `Placing` still shows the summary screen. `Placed` has no number.
    #[must_use]
    pub const fn number(self) -> Option<u8> {
        match self {
            Self::Address => Some(1),
            Self::Payment => Some(2),
            Self::Summary | Self::Placing => Some(3),
            Self::Placed => None,
        }
    }

    /// Display title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Address => "Shipping Address",
            Self::Payment => "Payment Method",
            Self::Summary => "Order Summary",
            Self::Placing => "Processing Order",
            Self::Placed => "Order Confirmed",
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Address => "address",
            Self::Payment => "payment",
            Self::Summary => "summary",
            Self::Placing => "placing",
            Self::Placed => "placed",
        };
        f.write_str(name)
    }
}

/// The collaborators needed to turn a cart into an order.
#[derive(Debug, Clone, Copy)]
pub struct PlacementContext<'a> {
    pub pricing: &'a PricingEngine,
    pub numbers: &'a OrderNumberGenerator,
    pub history: &'a OrderHistory,
}

/// One checkout attempt.
///
/// Address and payment values survive backward navigation.
#[derive(Debug, Clone, Default)]
pub struct CheckoutFlow {
    step: CheckoutStep,
    address: ShippingAddress,
    payment_method: PaymentMethod,
    placing_revision: Option<u64>,
    order: Option<Order>,
}

impl CheckoutFlow {
    /// A new flow at the address step.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    #[must_use]
    pub const fn address(&self) -> &ShippingAddress {
        &self.address
    }

    #[must_use]
    pub const fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    /// The placed order, once the flow reaches `Placed`.
    #[must_use]
    pub const fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    /// Replace the shipping address.
    ///
    /// # Errors
    ///
    /// Fails once placement has begun.
    pub fn set_address(&mut self, address: ShippingAddress) -> Result<(), CheckoutError> {
        *self.address_mut()? = address;
        Ok(())
    }

    /// Edit the shipping address in place. Validation happens on
    /// [`advance`](Self::advance).
    ///
    /// # Errors
    ///
    /// Fails once placement has begun.
    pub fn address_mut(&mut self) -> Result<&mut ShippingAddress, CheckoutError> {
        self.ensure_editable("edit the address")?;
        Ok(&mut self.address)
    }

    /// Choose a payment method.
    ///
    /// # Errors
    ///
    /// Fails once placement has begun.
    pub fn set_payment_method(&mut self, method: PaymentMethod) -> Result<(), CheckoutError> {
        self.ensure_editable("change the payment method")?;
        self.payment_method = method;
        Ok(())
    }

    /// Move to the next step.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::StepInvalid`] from `Address` with empty fields
    /// - [`CheckoutError::InvalidTransition`] from `Summary` or `Placed`
    /// - [`CheckoutError::OrderInProgress`] while placing
    pub fn advance(&mut self) -> Result<CheckoutStep, CheckoutError> {
        let next = match self.step {
            CheckoutStep::Address => {
                let missing = self.address.missing_fields();
                if !missing.is_empty() {
                    return Err(CheckoutError::StepInvalid { missing });
                }
                CheckoutStep::Payment
            }
            CheckoutStep::Payment => CheckoutStep::Summary,
            CheckoutStep::Placing => return Err(CheckoutError::OrderInProgress),
            step @ (CheckoutStep::Summary | CheckoutStep::Placed) => {
                return Err(CheckoutError::InvalidTransition {
                    step,
                    action: "advance",
                });
            }
        };
        self.move_to(next);
        Ok(next)
    }

    /// Move to the previous step.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::NoPreviousStep`] from `Address`
    /// - [`CheckoutError::OrderInProgress`] while placing
    /// - [`CheckoutError::InvalidTransition`] from `Placed`
    pub fn retreat(&mut self) -> Result<CheckoutStep, CheckoutError> {
        let previous = match self.step {
            CheckoutStep::Address => return Err(CheckoutError::NoPreviousStep),
            CheckoutStep::Payment => CheckoutStep::Address,
            CheckoutStep::Summary => CheckoutStep::Payment,
            CheckoutStep::Placing => return Err(CheckoutError::OrderInProgress),
            CheckoutStep::Placed => {
                return Err(CheckoutError::InvalidTransition {
                    step: CheckoutStep::Placed,
                    action: "go back",
                });
            }
        };
        self.move_to(previous);
        Ok(previous)
    }

    /// Enter `Placing`, recording the cart revision being ordered.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::OrderInProgress`] if placement already began
    /// - [`CheckoutError::StepInvalid`] if the address was blanked after `Address`
    /// - [`CheckoutError::EmptyCart`] if the cart has no lines
    /// - [`CheckoutError::InvalidTransition`] from any step but `Summary`
    pub fn begin_placement(&mut self, cart: &CartStore) -> Result<(), CheckoutError> {
        match self.step {
            CheckoutStep::Summary => {}
            CheckoutStep::Placing => return Err(CheckoutError::OrderInProgress),
            step => {
                return Err(CheckoutError::InvalidTransition {
                    step,
                    action: "place an order",
                });
            }
        }
        let missing = self.address.missing_fields();
        if !missing.is_empty() {
            return Err(CheckoutError::StepInvalid { missing });
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        self.placing_revision = Some(cart.revision());
        self.move_to(CheckoutStep::Placing);
        Ok(())
    }

    /// Finish a placement started with [`begin_placement`](Self::begin_placement).
    ///
    /// On success the cart is cleared and the flow is `Placed`. On failure
    /// the flow returns to `Summary` and the cart is untouched.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::InvalidTransition`] if placement has not begun
    /// - [`CheckoutError::CartChanged`] if the cart moved on since it began
    /// - [`CheckoutError::DuplicateOrderNumber`] if the issued number is taken
    pub fn complete_placement(
        &mut self,
        cart: &mut CartStore,
        context: PlacementContext<'_>,
    ) -> Result<Order, CheckoutError> {
        let Some(revision) = self.placing_revision.filter(|_| self.step == CheckoutStep::Placing)
        else {
            return Err(CheckoutError::InvalidTransition {
                step: self.step,
                action: "complete placement",
            });
        };
        if cart.revision() != revision {
            self.abort_placement();
            return Err(CheckoutError::CartChanged);
        }

        let breakdown = context.pricing.quote(cart.cart());
        let number = context.numbers.generate();
        if context.history.contains(&number) {
            self.abort_placement();
            return Err(CheckoutError::DuplicateOrderNumber(number));
        }

        let order = Order::new(
            number,
            cart.snapshot(),
            self.address.clone(),
            self.payment_method,
            breakdown,
            context.numbers.clock().now(),
        );
        cart.clear();
        self.placing_revision = None;
        self.order = Some(order.clone());
        self.move_to(CheckoutStep::Placed);

        info!(
            order_number = %order.number(),
            total = %order.total(),
            items = order.breakdown().item_count,
            "Order placed"
        );
        Ok(order)
    }

    /// Leave `Placing` without producing an order. A no-op in any other step.
    pub fn abort_placement(&mut self) {
        if self.step == CheckoutStep::Placing {
            self.placing_revision = None;
            self.move_to(CheckoutStep::Summary);
        }
    }

    /// Place the order in one call.
    ///
    /// Once the flow is `Placed`, calling this again returns the same order
    /// and changes nothing.
    ///
    /// # Errors
    ///
    /// See [`begin_placement`](Self::begin_placement) and
    /// [`complete_placement`](Self::complete_placement).
    pub fn place_order(
        &mut self,
        cart: &mut CartStore,
        context: PlacementContext<'_>,
    ) -> Result<Order, CheckoutError> {
        if let Some(order) = &self.order {
            debug!(order_number = %order.number(), "Order already placed");
            return Ok(order.clone());
        }
        self.begin_placement(cart)?;
        self.complete_placement(cart, context)
    }

    /// Start a new checkout at `Address` after an order was placed, keeping
    /// the entered address and payment method.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::OrderInProgress`] while placing
    /// - [`CheckoutError::InvalidTransition`] before an order was placed
    pub fn restart(&mut self) -> Result<(), CheckoutError> {
        match self.step {
            CheckoutStep::Placed => {}
            CheckoutStep::Placing => return Err(CheckoutError::OrderInProgress),
            step => {
                return Err(CheckoutError::InvalidTransition {
                    step,
                    action: "restart",
                });
            }
        }
        self.order = None;
        self.move_to(CheckoutStep::Address);
        Ok(())
    }

    fn ensure_editable(&self, action: &'static str) -> Result<(), CheckoutError> {
        match self.step {
            CheckoutStep::Placing => Err(CheckoutError::OrderInProgress),
            CheckoutStep::Placed => Err(CheckoutError::InvalidTransition {
                step: CheckoutStep::Placed,
                action,
            }),
            _ => Ok(()),
        }
    }

    fn move_to(&mut self, step: CheckoutStep) {
        debug!(from = %self.step, to = %step, "Checkout step changed");
        self.step = step;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use aisle_core::{AddressPreset, Category, Price};

    use super::*;
    use crate::catalog::tests::product;
    use crate::faults;
    use crate::order::SystemClock;
    use crate::storage::MemoryStore;

    struct Fixture {
        cart: CartStore,
        pricing: PricingEngine,
        numbers: OrderNumberGenerator,
        history: OrderHistory,
    }

    impl Fixture {
        fn new() -> Self {
            let storage = Arc::new(MemoryStore::new());
            let mut cart = CartStore::open(storage.clone());
            cart.add(&product("1", "UltraBook Pro", Category::Laptops, 3_000), 1)
                .unwrap();
            Self {
                cart,
                pricing: PricingEngine::default(),
                numbers: OrderNumberGenerator::default(),
                history: OrderHistory::open(storage),
            }
        }

        fn place(&mut self, flow: &mut CheckoutFlow) -> Result<Order, CheckoutError> {
            let context = PlacementContext {
                pricing: &self.pricing,
                numbers: &self.numbers,
                history: &self.history,
            };
            flow.place_order(&mut self.cart, context)
        }
    }

    fn at_summary() -> CheckoutFlow {
        let mut flow = CheckoutFlow::new();
        flow.set_address(ShippingAddress::preset(AddressPreset::Home))
            .unwrap();
        flow.advance().unwrap();
        flow.advance().unwrap();
        flow
    }

    #[test]
    fn test_starts_at_address() {
        let flow = CheckoutFlow::new();
        assert_eq!(flow.step(), CheckoutStep::Address);
        assert_eq!(flow.step().number(), Some(1));
        assert_eq!(flow.payment_method(), PaymentMethod::CreditCard);
    }

    #[test]
    fn test_advance_requires_complete_address() {
        let mut flow = CheckoutFlow::new();
        flow.address_mut().unwrap().name = "Jane".to_string();
        flow.address_mut().unwrap().city = "   ".to_string();

        let err = flow.advance().unwrap_err();
        assert_eq!(
            err,
            CheckoutError::StepInvalid {
                missing: vec![
                    AddressField::Street,
                    AddressField::City,
                    AddressField::State,
                    AddressField::ZipCode,
                ],
            }
        );
        assert_eq!(flow.step(), CheckoutStep::Address);

        flow.set_address(ShippingAddress::preset(AddressPreset::Work))
            .unwrap();
        assert_eq!(flow.advance().unwrap(), CheckoutStep::Payment);
    }

    #[test]
    fn test_placement_rechecks_address() {
        let mut fixture = Fixture::new();
        let mut flow = at_summary();
        flow.set_address(ShippingAddress::default()).unwrap();

        assert_eq!(
            fixture.place(&mut flow),
            Err(CheckoutError::StepInvalid {
                missing: vec![
                    AddressField::Name,
                    AddressField::Street,
                    AddressField::City,
                    AddressField::State,
                    AddressField::ZipCode,
                ],
            })
        );
        assert_eq!(flow.step(), CheckoutStep::Summary);
        assert!(flow.order().is_none());
        assert!(!fixture.cart.is_empty());

        flow.set_address(ShippingAddress::preset(AddressPreset::Demo))
            .unwrap();
        assert!(fixture.place(&mut flow).is_ok());
    }

    #[test]
    fn test_step_invalid_message_lists_fields() {
        let err = CheckoutError::StepInvalid {
            missing: vec![AddressField::Name, AddressField::ZipCode],
        };
        assert_eq!(err.to_string(), "missing required fields: name, zip code");
    }

    #[test]
    fn test_retreat_from_address_fails() {
        let mut flow = CheckoutFlow::new();
        assert_eq!(flow.retreat(), Err(CheckoutError::NoPreviousStep));
    }

    #[test]
    fn test_advance_from_summary_is_invalid() {
        let mut flow = at_summary();
        assert_eq!(
            flow.advance(),
            Err(CheckoutError::InvalidTransition {
                step: CheckoutStep::Summary,
                action: "advance",
            })
        );
    }

    #[test]
    fn test_backward_navigation_preserves_values() {
        let mut flow = at_summary();
        flow.retreat().unwrap();
        flow.set_payment_method(PaymentMethod::ApplePay).unwrap();
        flow.retreat().unwrap();
        assert_eq!(flow.step(), CheckoutStep::Address);
        assert_eq!(flow.address(), &ShippingAddress::preset(AddressPreset::Home));

        flow.advance().unwrap();
        flow.advance().unwrap();
        assert_eq!(flow.step(), CheckoutStep::Summary);
        assert_eq!(flow.payment_method(), PaymentMethod::ApplePay);
    }

    #[test]
    fn test_place_order_prices_cart_and_clears_it() {
        let mut fixture = Fixture::new();
        let expected = fixture.pricing.quote(fixture.cart.cart());
        let mut flow = at_summary();

        let order = fixture.place(&mut flow).unwrap();
        assert_eq!(order.total(), expected.total);
        assert_eq!(order.total(), Price::from_cents(3_999));
        assert_eq!(order.items().len(), 1);
        assert!(fixture.cart.is_empty());
        assert_eq!(flow.step(), CheckoutStep::Placed);
        assert_eq!(flow.order(), Some(&order));
    }

    #[test]
    fn test_place_order_is_idempotent_once_placed() {
        let mut fixture = Fixture::new();
        let mut flow = at_summary();
        let first = fixture.place(&mut flow).unwrap();

        fixture
            .cart
            .add(&product("2", "Pixelate X", Category::Phones, 800), 1)
            .unwrap();
        let second = fixture.place(&mut flow).unwrap();
        assert_eq!(first, second);
        assert_eq!(fixture.cart.lines().len(), 1);
    }

    #[test]
    fn test_reentrant_placement_is_rejected() {
        let mut fixture = Fixture::new();
        let mut flow = at_summary();
        flow.begin_placement(&fixture.cart).unwrap();

        assert_eq!(
            flow.begin_placement(&fixture.cart),
            Err(CheckoutError::OrderInProgress)
        );
        assert_eq!(fixture.place(&mut flow), Err(CheckoutError::OrderInProgress));
        assert_eq!(flow.retreat(), Err(CheckoutError::OrderInProgress));
        assert_eq!(
            flow.set_payment_method(PaymentMethod::PayPal),
            Err(CheckoutError::OrderInProgress)
        );

        flow.abort_placement();
        assert_eq!(flow.step(), CheckoutStep::Summary);
        assert!(!fixture.cart.is_empty());
    }

    #[test]
    fn test_two_phase_placement() {
        let mut fixture = Fixture::new();
        let mut flow = at_summary();
        flow.begin_placement(&fixture.cart).unwrap();
        assert_eq!(flow.step(), CheckoutStep::Placing);
        assert!(!fixture.cart.is_empty());

        let context = PlacementContext {
            pricing: &fixture.pricing,
            numbers: &fixture.numbers,
            history: &fixture.history,
        };
        let order = flow.complete_placement(&mut fixture.cart, context).unwrap();
        assert_eq!(order.payment_method(), PaymentMethod::CreditCard);
        assert!(fixture.cart.is_empty());
    }

    #[test]
    fn test_cart_change_during_placement_aborts() {
        let mut fixture = Fixture::new();
        let mut flow = at_summary();
        flow.begin_placement(&fixture.cart).unwrap();
        fixture
            .cart
            .add(&product("2", "Pixelate X", Category::Phones, 800), 2)
            .unwrap();

        let context = PlacementContext {
            pricing: &fixture.pricing,
            numbers: &fixture.numbers,
            history: &fixture.history,
        };
        assert_eq!(
            flow.complete_placement(&mut fixture.cart, context),
            Err(CheckoutError::CartChanged)
        );
        assert_eq!(flow.step(), CheckoutStep::Summary);
        assert_eq!(fixture.cart.lines().len(), 2);
        assert!(flow.order().is_none());
    }

    #[test]
    fn test_empty_cart_cannot_be_placed() {
        let mut flow = at_summary();
        let cart = CartStore::open(Arc::new(MemoryStore::new()));
        assert_eq!(flow.begin_placement(&cart), Err(CheckoutError::EmptyCart));
        assert_eq!(flow.step(), CheckoutStep::Summary);
    }

    #[test]
    fn test_place_from_wrong_step_is_invalid() {
        let mut fixture = Fixture::new();
        let mut flow = CheckoutFlow::new();
        assert_eq!(
            fixture.place(&mut flow),
            Err(CheckoutError::InvalidTransition {
                step: CheckoutStep::Address,
                action: "place an order",
            })
        );
        assert!(!fixture.cart.is_empty());
    }

    #[test]
    fn test_duplicate_number_leaves_cart_untouched() {
        let mut fixture = Fixture::new();
        fixture.numbers = OrderNumberGenerator::new(Arc::new(SystemClock), faults::always());

        let mut first_flow = at_summary();
        let first = fixture.place(&mut first_flow).unwrap();
        assert_eq!(first.number(), &OrderNumber::collision());
        fixture.history.record(first).unwrap();

        fixture
            .cart
            .add(&product("2", "Pixelate X", Category::Phones, 800), 1)
            .unwrap();
        let mut second_flow = at_summary();
        assert_eq!(
            fixture.place(&mut second_flow),
            Err(CheckoutError::DuplicateOrderNumber(OrderNumber::collision()))
        );
        assert_eq!(second_flow.step(), CheckoutStep::Summary);
        assert_eq!(fixture.cart.lines().len(), 1);
    }

    #[test]
    fn test_restart_keeps_entered_values() {
        let mut fixture = Fixture::new();
        let mut flow = at_summary();
        flow.set_payment_method(PaymentMethod::DebitCard).unwrap();
        fixture.place(&mut flow).unwrap();
        assert!(flow.set_payment_method(PaymentMethod::PayPal).is_err());

        flow.restart().unwrap();
        assert_eq!(flow.step(), CheckoutStep::Address);
        assert!(flow.order().is_none());
        assert_eq!(flow.payment_method(), PaymentMethod::DebitCard);
    }

    #[test]
    fn test_restart_before_placement_is_invalid() {
        let mut flow = at_summary();
        assert_eq!(
            flow.restart(),
            Err(CheckoutError::InvalidTransition {
                step: CheckoutStep::Summary,
                action: "restart",
            })
        );
        assert_eq!(flow.step(), CheckoutStep::Summary);

        let mut fresh = CheckoutFlow::new();
        assert!(fresh.restart().is_err());
        assert_eq!(fresh.step(), CheckoutStep::Address);
    }
}
