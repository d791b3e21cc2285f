//! Shipping address collected during checkout.
//!
//! This is a data-collection record, not a verified address: the only rule is
//! that every field is filled in.

use core::fmt;

use serde::{Deserialize, Serialize};

/// One of the five address fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressField {
    Name,
    Street,
    City,
    State,
    ZipCode,
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Street => write!(f, "street"),
            Self::City => write!(f, "city"),
            Self::State => write!(f, "state"),
            Self::ZipCode => write!(f, "zip code"),
        }
    }
}

/// Canned addresses offered as quick-fill shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressPreset {
    Home,
    Work,
    Demo,
}

/// A shipping address.
///
/// ## Examples
///
/// ```
/// use aisle_core::{AddressField, ShippingAddress};
///
/// let mut address = ShippingAddress::default();
/// assert_eq!(address.missing_fields().len(), 5);
///
/// address.name = "Jane Smith".to_string();
/// assert!(!address.missing_fields().contains(&AddressField::Name));
/// assert!(!address.is_complete());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl ShippingAddress {
    /// Create an address from its five fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        zip_code: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            street: street.into(),
            city: city.into(),
            state: state.into(),
            zip_code: zip_code.into(),
        }
    }

    /// One of the quick-fill addresses.
    #[must_use]
    pub fn preset(preset: AddressPreset) -> Self {
        match preset {
            AddressPreset::Home => {
                Self::new("John Doe", "123 Main St", "Anytown", "CA", "12345")
            }
            AddressPreset::Work => Self::new(
                "Jane Smith",
                "456 Business Blvd",
                "Corporate City",
                "NY",
                "67890",
            ),
            AddressPreset::Demo => {
                Self::new("Demo User", "789 Test Avenue", "Sample City", "TX", "54321")
            }
        }
    }

    /// Fields that are empty or whitespace-only, in form order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<AddressField> {
        [
            (AddressField::Name, &self.name),
            (AddressField::Street, &self.street),
            (AddressField::City, &self.city),
            (AddressField::State, &self.state),
            (AddressField::ZipCode, &self.zip_code),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    /// Returns true if every field is filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

impl fmt::Display for ShippingAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {} {}",
            self.name, self.street, self.city, self.state, self.zip_code
        )
    }
}
