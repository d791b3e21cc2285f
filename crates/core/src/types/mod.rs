//! Core types for Aisle.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod id;
pub mod price;
pub mod product;
pub mod status;

pub use address::{AddressField, AddressPreset, ShippingAddress};
pub use id::*;
pub use price::{Price, PriceError};
pub use product::{Product, ProductError, Review};
pub use status::*;
