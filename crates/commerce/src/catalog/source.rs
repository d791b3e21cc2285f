//! Catalog suppliers.

use std::fs;
use std::path::{Path, PathBuf};

use aisle_core::Product;
use serde_json::Value;
use tracing::warn;

use super::CatalogError;

/// Supplies the product records a [`Catalog`](super::Catalog) is built from.
pub trait CatalogSource {
    /// Load every product, in feed order.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed is missing or cannot be parsed.
    fn load(&self) -> Result<Vec<Product>, CatalogError>;
}

/// A JSON array of products stored on disk.
///
/// Records that fail to decode (a negative price, a missing field) are
/// skipped; the feed itself must still be a JSON array.
#[derive(Debug, Clone)]
pub struct JsonFileCatalog {
    path: PathBuf,
}

impl JsonFileCatalog {
    /// Create a source reading from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The feed location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for JsonFileCatalog {
    fn load(&self) -> Result<Vec<Product>, CatalogError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| CatalogError::Read {
            path: self.path.display().to_string(),
            source,
        })?;
        let records: Vec<Value> = serde_json::from_str(&contents)?;
        Ok(records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| {
                serde_json::from_value::<Product>(record)
                    .inspect_err(|e| {
                        warn!(index, error = %e, "Skipping undecodable product record");
                    })
                    .ok()
            })
            .collect())
    }
}

/// An in-memory product list.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog(pub Vec<Product>);

impl CatalogSource for StaticCatalog {
    fn load(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.0.clone())
    }
}
