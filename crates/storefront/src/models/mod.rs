//! Domain models for the storefront.
//!
//! Inbound records (products, profiles, stored cart items) come from an API
//! and a storage layer that are loose about field names and types. Every
//! model normalizes at deserialization so the rest of the crate only sees
//! one shape.

mod line_item;
mod order;
mod product;
mod profile;

pub use line_item::{
    CartEntry, CartLineItem, LineItemError, PresentationFields, item_count, total,
};
pub use order::{DeliveryAddress, OrderConfirmation, OrderItem, OrderRequest};
pub use product::{Product, ProductError, QuantityError};
pub use profile::UserProfile;

/// Deserializers that accept whatever type upstream happened to send.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Strings as-is, numbers and booleans stringified, blank or anything
    /// else as `None`.
    pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        })
    }

    /// Non-negative counts from numbers or numeric strings.
    ///
    /// Negative values clamp to zero; values above `u32::MAX` saturate.
    pub fn count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parsed = match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
                .or_else(|| n.as_f64().map(truncate)),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        Ok(parsed.map(|v| u32::try_from(v.max(0)).unwrap_or(u32::MAX)))
    }

    // Float-to-int `as` casts saturate.
    #[allow(clippy::cast_possible_truncation)]
    fn truncate(value: f64) -> i64 {
        value.trunc() as i64
    }
}
