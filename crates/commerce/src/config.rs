//! Commerce configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `AISLE_DATA_DIR` - Directory holding the cart and order history (default: .aisle)
//! - `AISLE_CATALOG_PATH` - Product feed JSON file (default: catalog/products.json)
//! - `AISLE_FREE_SHIPPING_THRESHOLD` - Subtotals above this ship free (default: 50.00)
//! - `AISLE_FLAT_SHIPPING_FEE` - Shipping fee at or below the threshold (default: 9.99)
//! - `AISLE_FAULT_SURCHARGE_PROBABILITY` - Chance of a random surcharge on totals (default: 0)
//! - `AISLE_FAULT_ORDER_COLLISION_PROBABILITY` - Chance of a colliding order number (default: 0)
//! - `AISLE_FAULT_NEWEST_SORT_PROBABILITY` - Chance of a reversed "newest" sort (default: 0)
//! - `AISLE_FAULT_SEARCH_DROPOUT_PROBABILITY` - Chance of an empty search result (default: 0)
//! - `AISLE_CHECKOUT_DELAY_MS` - Processing delay between placement phases (default: 0)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aisle_core::Price;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::catalog::{Catalog, JsonFileCatalog, QueryFaults};
use crate::faults::{self, RandomFault};
use crate::order::{OrderNumberGenerator, SystemClock};
use crate::pricing::{PricingEngine, ShippingPolicy, SurchargeFault};
use crate::storage::{FileStore, StorageError};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Probabilities for each fault-injection policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaultConfig {
    /// Random surcharge on the grand total.
    pub surcharge: RandomFault,
    /// Order number replaced by a known colliding value.
    pub order_collision: RandomFault,
    /// "Newest" sort results reversed.
    pub newest_sort: RandomFault,
    /// Search results dropped for queries longer than three characters.
    pub search_dropout: RandomFault,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

impl FaultConfig {
    /// Every fault off.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            surcharge: RandomFault::never(),
            order_collision: RandomFault::never(),
            newest_sort: RandomFault::never(),
            search_dropout: RandomFault::never(),
        }
    }

    /// The rates the storefront originally shipped with.
    #[must_use]
    pub const fn original_rates() -> Self {
        Self {
            surcharge: RandomFault::with_probability(1.0 / 15.0),
            order_collision: RandomFault::with_probability(1.0 / 20.0),
            newest_sort: RandomFault::with_probability(1.0 / 5.0),
            search_dropout: RandomFault::with_probability(1.0 / 25.0),
        }
    }

    /// Returns true if no fault can fire.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        [
            self.surcharge,
            self.order_collision,
            self.newest_sort,
            self.search_dropout,
        ]
        .iter()
        .all(|fault| fault.probability() <= 0.0)
    }
}

/// Commerce configuration.
#[derive(Debug, Clone)]
pub struct CommerceConfig {
    /// Directory holding persisted slots
    pub data_dir: PathBuf,
    /// Product feed location
    pub catalog_path: PathBuf,
    /// Shipping rules
    pub shipping: ShippingPolicy,
    /// Fault-injection rates
    pub faults: FaultConfig,
    /// Delay applied between placement phases
    pub checkout_delay: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".aisle"),
            catalog_path: PathBuf::from("catalog/products.json"),
            shipping: ShippingPolicy::default(),
            faults: FaultConfig::disabled(),
            checkout_delay: Duration::ZERO,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl CommerceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Lookup(&lookup);
        let defaults = ShippingPolicy::default();

        let shipping = ShippingPolicy {
            free_shipping_threshold: env
                .price("AISLE_FREE_SHIPPING_THRESHOLD")?
                .unwrap_or(defaults.free_shipping_threshold),
            flat_shipping_fee: env
                .price("AISLE_FLAT_SHIPPING_FEE")?
                .unwrap_or(defaults.flat_shipping_fee),
        };

        let faults = FaultConfig {
            surcharge: env.probability("AISLE_FAULT_SURCHARGE_PROBABILITY")?,
            order_collision: env.probability("AISLE_FAULT_ORDER_COLLISION_PROBABILITY")?,
            newest_sort: env.probability("AISLE_FAULT_NEWEST_SORT_PROBABILITY")?,
            search_dropout: env.probability("AISLE_FAULT_SEARCH_DROPOUT_PROBABILITY")?,
        };

        let checkout_delay = env
            .optional("AISLE_CHECKOUT_DELAY_MS")
            .map(|value| {
                value.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidEnvVar("AISLE_CHECKOUT_DELAY_MS".to_string(), e.to_string())
                })
            })
            .transpose()?
            .map_or(Duration::ZERO, Duration::from_millis);

        Ok(Self {
            data_dir: PathBuf::from(env.or_default("AISLE_DATA_DIR", ".aisle")),
            catalog_path: PathBuf::from(
                env.or_default("AISLE_CATALOG_PATH", "catalog/products.json"),
            ),
            shipping,
            faults,
            checkout_delay,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// A pricing engine with the configured shipping rules and surcharge fault.
    #[must_use]
    pub fn pricing_engine(&self) -> PricingEngine {
        PricingEngine::new(
            self.shipping,
            SurchargeFault::new(faults::shared(self.faults.surcharge)),
        )
    }

    /// Query faults for the catalog.
    #[must_use]
    pub fn query_faults(&self) -> QueryFaults {
        QueryFaults {
            newest_reversal: faults::shared(self.faults.newest_sort),
            search_dropout: faults::shared(self.faults.search_dropout),
        }
    }

    /// An order number generator on the system clock.
    #[must_use]
    pub fn order_number_generator(&self) -> OrderNumberGenerator {
        OrderNumberGenerator::new(
            Arc::new(SystemClock),
            faults::shared(self.faults.order_collision),
        )
    }

    /// Load the catalog from the configured feed. Never fails.
    #[must_use]
    pub fn load_catalog(&self) -> Catalog {
        Catalog::from_source(&JsonFileCatalog::new(&self.catalog_path), self.query_faults())
    }

    /// Open the file-backed store in the data directory.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the directory cannot be created.
    pub fn open_storage(&self) -> Result<FileStore, StorageError> {
        FileStore::open(&self.data_dir)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Lookup<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Lookup<'_, F> {
    /// Get an optional variable, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse an optional non-negative amount.
    fn price(&self, key: &str) -> Result<Option<Price>, ConfigError> {
        self.optional(key)
            .map(|value| {
                value
                    .trim()
                    .parse::<Decimal>()
                    .map_err(|e| e.to_string())
                    .and_then(|amount| Price::new(amount).map_err(|e| e.to_string()))
                    .map_err(|reason| ConfigError::InvalidEnvVar(key.to_string(), reason))
            })
            .transpose()
    }

    /// Parse an optional probability, defaulting to zero.
    fn probability(&self, key: &str) -> Result<RandomFault, ConfigError> {
        let Some(value) = self.optional(key) else {
            return Ok(RandomFault::never());
        };
        value
            .trim()
            .parse::<f64>()
            .map_err(|e| e.to_string())
            .and_then(|p| RandomFault::new(p).map_err(|e| e.to_string()))
            .map_err(|reason| ConfigError::InvalidEnvVar(key.to_string(), reason))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<CommerceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CommerceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from(".aisle"));
        assert_eq!(config.catalog_path, PathBuf::from("catalog/products.json"));
        assert_eq!(config.shipping.free_shipping_threshold, Price::from_cents(5_000));
        assert_eq!(config.shipping.flat_shipping_fee, Price::from_cents(999));
        assert!(config.faults.is_disabled());
        assert_eq!(config.checkout_delay, Duration::ZERO);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("AISLE_DATA_DIR", "/tmp/aisle"),
            ("AISLE_FREE_SHIPPING_THRESHOLD", "75.50"),
            ("AISLE_FLAT_SHIPPING_FEE", "4.99"),
            ("AISLE_FAULT_SEARCH_DROPOUT_PROBABILITY", "0.25"),
            ("AISLE_CHECKOUT_DELAY_MS", "1500"),
            ("SENTRY_DSN", "https://key@sentry.invalid/1"),
        ])
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/aisle"));
        assert_eq!(config.shipping.free_shipping_threshold, Price::from_cents(7_550));
        assert_eq!(config.shipping.flat_shipping_fee, Price::from_cents(499));
        assert!((config.faults.search_dropout.probability() - 0.25).abs() < f64::EPSILON);
        assert!(!config.faults.is_disabled());
        assert_eq!(config.checkout_delay, Duration::from_millis(1_500));
        assert!(config.sentry_dsn.is_some());
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = config_from(&[("AISLE_DATA_DIR", "  "), ("SENTRY_DSN", "")]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from(".aisle"));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_probability_out_of_range() {
        let result = config_from(&[("AISLE_FAULT_SURCHARGE_PROBABILITY", "1.5")]);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "AISLE_FAULT_SURCHARGE_PROBABILITY"
        ));
    }

    #[test]
    fn test_invalid_price_and_delay() {
        assert!(config_from(&[("AISLE_FLAT_SHIPPING_FEE", "-1")]).is_err());
        assert!(config_from(&[("AISLE_FREE_SHIPPING_THRESHOLD", "fifty")]).is_err());
        assert!(config_from(&[("AISLE_CHECKOUT_DELAY_MS", "soon")]).is_err());
    }

    #[test]
    fn test_original_rates() {
        let faults = FaultConfig::original_rates();
        assert!((faults.surcharge.probability() - 1.0 / 15.0).abs() < f64::EPSILON);
        assert!((faults.order_collision.probability() - 0.05).abs() < f64::EPSILON);
        assert!((faults.newest_sort.probability() - 0.2).abs() < f64::EPSILON);
        assert!((faults.search_dropout.probability() - 0.04).abs() < f64::EPSILON);
    }

    #[test]
    fn test_builders_respect_disabled_faults() {
        let config = config_from(&[]).unwrap();
        let generator = config.order_number_generator();
        assert_ne!(generator.generate(), generator.generate());
        assert!(config.query_faults().search_dropout.is_disabled());
    }
}
