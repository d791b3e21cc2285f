//! Aisle Core - Shared domain types.
//!
//! This crate provides the types used across all Aisle components:
//! - `commerce` - Catalog, cart, pricing, and checkout engine
//! - `cli` - Command-line front end for driving a shopping session
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no storage,
//! no randomness. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs and prices, plus products, addresses,
//!   and the closed enums (categories, payment methods, statuses, sort options)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
