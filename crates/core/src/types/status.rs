//! Closed enums: product categories, payment methods, order statuses, and
//! catalog sort options.

use serde::{Deserialize, Serialize};

/// Error returned when parsing one of the enums in this module fails.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Product category.
///
/// Wire names match the catalog feed (`"Gaming Consoles"`, `"TVs"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Laptops,
    #[serde(rename = "TVs")]
    Tvs,
    Phones,
    #[serde(rename = "Gaming Consoles")]
    GamingConsoles,
    #[serde(rename = "Smart Home Devices")]
    SmartHome,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Self; 5] = [
        Self::Laptops,
        Self::Tvs,
        Self::Phones,
        Self::GamingConsoles,
        Self::SmartHome,
    ];

    /// Display name, identical to the wire name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Laptops => "Laptops",
            Self::Tvs => "TVs",
            Self::Phones => "Phones",
            Self::GamingConsoles => "Gaming Consoles",
            Self::SmartHome => "Smart Home Devices",
        }
    }

    /// Short slug used on the command line.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Laptops => "laptops",
            Self::Tvs => "tvs",
            Self::Phones => "phones",
            Self::GamingConsoles => "gaming",
            Self::SmartHome => "smart-home",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.slug().eq_ignore_ascii_case(s) || c.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseEnumError::new("category", s))
    }
}

/// Payment method chosen at checkout.
///
/// Payment data is simulated; only the selection is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    DebitCard,
    #[serde(rename = "paypal")]
    PayPal,
    ApplePay,
}

impl PaymentMethod {
    /// Every payment method, in display order.
    pub const ALL: [Self; 4] = [
        Self::CreditCard,
        Self::DebitCard,
        Self::PayPal,
        Self::ApplePay,
    ];

    /// Human-readable name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CreditCard => "Credit Card",
            Self::DebitCard => "Debit Card",
            Self::PayPal => "PayPal",
            Self::ApplePay => "Apple Pay",
        }
    }

    /// Whether the method is card-based (card details are shown, masked).
    #[must_use]
    pub const fn requires_card(self) -> bool {
        matches!(self, Self::CreditCard | Self::DebitCard)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreditCard => write!(f, "credit_card"),
            Self::DebitCard => write!(f, "debit_card"),
            Self::PayPal => write!(f, "paypal"),
            Self::ApplePay => write!(f, "apple_pay"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "credit_card" => Ok(Self::CreditCard),
            "debit_card" => Ok(Self::DebitCard),
            "paypal" => Ok(Self::PayPal),
            "apple_pay" => Ok(Self::ApplePay),
            _ => Err(ParseEnumError::new("payment method", s)),
        }
    }
}

/// Order lifecycle status.
///
/// The checkout engine only ever produces [`OrderStatus::Placed`]; the later
/// states are owned by fulfillment systems outside this workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Placed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placed => write!(f, "placed"),
            Self::Processing => write!(f, "processing"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Catalog sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    /// Featured products first, catalog order otherwise.
    #[default]
    Featured,
    /// Cheapest first.
    PriceAsc,
    /// Most expensive first.
    PriceDesc,
    /// Highest rated first.
    RatingDesc,
    /// Catalog load order.
    Newest,
}

impl SortOption {
    /// Every sort option, in display order.
    pub const ALL: [Self; 5] = [
        Self::Featured,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::RatingDesc,
        Self::Newest,
    ];
}

impl std::fmt::Display for SortOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Featured => write!(f, "featured"),
            Self::PriceAsc => write!(f, "price-asc"),
            Self::PriceDesc => write!(f, "price-desc"),
            Self::RatingDesc => write!(f, "rating-desc"),
            Self::Newest => write!(f, "newest"),
        }
    }
}

impl std::str::FromStr for SortOption {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "featured" => Ok(Self::Featured),
            "price-asc" => Ok(Self::PriceAsc),
            "price-desc" => Ok(Self::PriceDesc),
            "rating-desc" | "rating" => Ok(Self::RatingDesc),
            "newest" => Ok(Self::Newest),
            _ => Err(ParseEnumError::new("sort option", s)),
        }
    }
}
