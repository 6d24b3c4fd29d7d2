//! Order status as reported by the orders API.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// The orders API is inconsistent about casing ("Pending" vs "pending"), so
/// both spellings are accepted when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    #[serde(alias = "Pending")]
    Pending,
    #[serde(alias = "Processing")]
    Processing,
    #[serde(alias = "Shipped")]
    Shipped,
    #[serde(alias = "Delivered")]
    Delivered,
    #[serde(alias = "Cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_both_casings() {
        let upper: OrderStatus = serde_json::from_str("\"Pending\"").unwrap();
        let lower: OrderStatus = serde_json::from_str("\"shipped\"").unwrap();
        assert_eq!(upper, OrderStatus::Pending);
        assert_eq!(lower, OrderStatus::Shipped);
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Delivered).unwrap(),
            "\"delivered\""
        );
    }
}
