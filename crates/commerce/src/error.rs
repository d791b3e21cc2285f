//! Unified error handling.
//!
//! Each module has its own error enum. [`CommerceError`] wraps them for
//! callers that drive a whole [`Session`](crate::session::Session).

use aisle_core::{PriceError, ProductId};
use thiserror::Error;

use crate::cart::CartError;
use crate::catalog::CatalogError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Session-level error type.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// A cart mutation was rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// A checkout transition was rejected.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// A catalog query could not be built.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The storage substrate could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A monetary value was rejected.
    #[error("Price error: {0}")]
    Price(#[from] PriceError),

    /// No product with this ID is in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Another operation holds the session.
    #[error("Session is busy")]
    Busy,

    /// An earlier operation panicked while holding the session.
    #[error("Session state is poisoned")]
    Poisoned,
}

impl CommerceError {
    /// Returns true for errors caused by the request itself, which callers
    /// should report and re-present rather than treat as failures.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Cart(_)
                | Self::Checkout(_)
                | Self::Price(_)
                | Self::ProductNotFound(_)
                | Self::Catalog(CatalogError::InvalidPriceRange { .. })
        )
    }
}

/// Result type alias for `CommerceError`.
pub type Result<T> = std::result::Result<T, CommerceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions_and_classification() {
        let err: CommerceError = CheckoutError::NoPreviousStep.into();
        assert!(err.is_user_error());
        assert_eq!(err.to_string(), "Checkout error: already at the first checkout step");

        let err: CommerceError = StorageError::LockPoisoned.into();
        assert!(!err.is_user_error());
        assert!(!CommerceError::Busy.is_user_error());
        assert!(CommerceError::ProductNotFound(ProductId::new("x")).is_user_error());
    }
}
