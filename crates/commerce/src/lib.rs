//! Aisle Commerce - Catalog, cart, pricing, and checkout engine.
//!
//! # Architecture
//!
//! ```text
//! Catalog ──────────────┐
//!   │ search/filter/sort │
//!   ▼                    ▼
//! CartStore ──► PricingEngine ──► CheckoutFlow ──► Order ──► OrderHistory
//!   │                                  │
//!   └──────── KeyValueStore ◄──────────┘
//! ```
//!
//! Placing an order clears the cart through the same store.
//!
//! Everything is owned by an explicitly constructed [`Session`]; there is no
//! global state. Randomized misbehaviour (surcharges, colliding order numbers,
//! flaky sorts, dropped searches) lives behind [`faults::FaultPolicy`] objects
//! that are disabled unless configured.
//!
//! # Modules
//!
//! - [`catalog`] - Product catalog loading and queries
//! - [`cart`] - Cart lines and the persisted cart store
//! - [`pricing`] - Subtotal, shipping, and total derivation
//! - [`order`] - Order numbers, orders, and order history
//! - [`checkout`] - The address → payment → summary → placed state machine
//! - [`session`] - One shopper's state, optionally shared across threads
//! - [`storage`] - Key-value persistence slots
//! - [`faults`] - Fault-injection policies
//! - [`config`] - Environment configuration
//! - [`error`] - Unified error type

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod faults;
pub mod order;
pub mod pricing;
pub mod session;
pub mod storage;

pub use cart::{Cart, CartError, CartLine, CartStore};
pub use catalog::{Catalog, CatalogError, CatalogQuery, PriceRange, QueryFaults};
pub use checkout::{CheckoutError, CheckoutFlow, CheckoutStep};
pub use config::{CommerceConfig, ConfigError, FaultConfig};
pub use error::CommerceError;
pub use order::{Order, OrderHistory, OrderNumberGenerator};
pub use pricing::{PriceBreakdown, PricingEngine, ShippingPolicy};
pub use session::{Session, SharedSession};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
