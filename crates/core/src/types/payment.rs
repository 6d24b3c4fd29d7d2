//! Payment method and the details collected for it at checkout.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the buyer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    /// Cash on delivery. No details are collected.
    #[default]
    #[serde(rename = "cod")]
    CashOnDelivery,
    /// UPI transfer.
    #[serde(rename = "upi")]
    Upi,
    /// Credit or debit card.
    #[serde(rename = "card")]
    Card,
}

impl PaymentMethod {
    /// Wire code used by the orders API.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::CashOnDelivery => "cod",
            Self::Upi => "upi",
            Self::Card => "card",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CashOnDelivery => "Cash on Delivery",
            Self::Upi => "UPI",
            Self::Card => "Credit/Debit Card",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a payment method code is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown payment method: {0}")]
pub struct UnknownPaymentMethod(pub String);

impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cod" => Ok(Self::CashOnDelivery),
            "upi" => Ok(Self::Upi),
            "card" => Ok(Self::Card),
            other => Err(UnknownPaymentMethod(other.to_string())),
        }
    }
}

/// Payment details entered for non-cash methods.
///
/// Empty fields are omitted on the wire, so cash on delivery serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_expiry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_cvv: Option<String>,
}

impl PaymentDetails {
    /// Details to send for `method`: nothing for cash on delivery.
    #[must_use]
    pub fn for_method(&self, method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::CashOnDelivery => Self::default(),
            PaymentMethod::Upi | PaymentMethod::Card => self.clone(),
        }
    }
}
