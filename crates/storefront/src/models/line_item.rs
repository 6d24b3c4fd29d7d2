//! Cart line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use creamery_core::{ProductId, UserId};

use super::Product;
use super::lenient;

/// Why a stored line item record could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineItemError {
    /// None of `itemId`, `id`, `_id`, `productId` held a usable value.
    #[error("line item has no product identifier")]
    MissingIdentifier,

    /// Neither `unitPrice` nor `price` was present.
    #[error("line item {0} has no unit price")]
    MissingPrice(ProductId),

    /// Stored quantity was zero.
    #[error("line item {0} has a zero quantity")]
    ZeroQuantity(ProductId),
}

/// Display-only data carried with a line item.
///
/// Captured from the product when the item is added; never consulted for
/// pricing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationFields {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Advisory minimum order quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_order: Option<u32>,
    /// Stock level at the time the item was added.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

/// What a surface hands to the cart when the user adds a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEntry {
    pub item_id: ProductId,
    pub unit_price: Decimal,
    pub presentation: PresentationFields,
}

impl From<&Product> for CartEntry {
    fn from(product: &Product) -> Self {
        Self {
            item_id: product.id.clone(),
            unit_price: product.price,
            presentation: PresentationFields {
                name: product.name.clone(),
                image_url: product.image_url.clone(),
                unit: product.unit.clone(),
                min_order: product.min_order,
                stock: product.stock,
            },
        }
    }
}

/// One product-and-quantity row in a cart partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawLineItem")]
pub struct CartLineItem {
    pub item_id: ProductId,
    /// Identity that added the item; `None` for an anonymous session.
    pub owner_id: Option<UserId>,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(flatten)]
    pub presentation: PresentationFields,
}

impl CartLineItem {
    /// Build a line item from an entry for `owner`.
    #[must_use]
    pub fn new(entry: CartEntry, owner_id: Option<UserId>, quantity: u32) -> Self {
        Self {
            item_id: entry.item_id,
            owner_id,
            quantity: quantity.max(1),
            unit_price: entry.unit_price,
            presentation: entry.presentation,
        }
    }

    /// `unit_price * quantity`, saturating at the decimal range.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }

    /// Whether the quantity satisfies the advisory minimum order.
    #[must_use]
    pub fn meets_minimum(&self) -> bool {
        self.quantity >= self.presentation.min_order.unwrap_or(1)
    }
}

/// Sum of quantities.
#[must_use]
pub fn item_count(items: &[CartLineItem]) -> u64 {
    items.iter().map(|item| u64::from(item.quantity)).sum()
}

/// Sum of line totals, saturating at the decimal range.
#[must_use]
pub fn total<'a>(items: impl IntoIterator<Item = &'a CartLineItem>) -> Decimal {
    items
        .into_iter()
        .fold(Decimal::ZERO, |acc, item| acc.saturating_add(item.line_total()))
}

/// Stored line item as found on disk, including legacy field spellings.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLineItem {
    #[serde(default)]
    item_id: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, rename = "_id")]
    mongo_id: Option<Value>,
    #[serde(default)]
    product_id: Option<Value>,
    #[serde(default)]
    owner_id: Option<Value>,
    #[serde(default)]
    user_id: Option<Value>,
    #[serde(default)]
    quantity: Option<u32>,
    #[serde(default)]
    unit_price: Option<Decimal>,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    unit: Option<String>,
    #[serde(default, deserialize_with = "lenient::count")]
    min_order: Option<u32>,
    #[serde(default, deserialize_with = "lenient::count")]
    stock: Option<u32>,
}

impl TryFrom<RawLineItem> for CartLineItem {
    type Error = LineItemError;

    fn try_from(raw: RawLineItem) -> Result<Self, Self::Error> {
        let item_id = [&raw.item_id, &raw.id, &raw.mongo_id, &raw.product_id]
            .into_iter()
            .flatten()
            .find_map(ProductId::from_json)
            .ok_or(LineItemError::MissingIdentifier)?;

        let owner_id = [&raw.owner_id, &raw.user_id]
            .into_iter()
            .flatten()
            .find_map(UserId::from_json);

        let unit_price = raw
            .unit_price
            .or(raw.price)
            .ok_or_else(|| LineItemError::MissingPrice(item_id.clone()))?;

        let quantity = match raw.quantity {
            None => 1,
            Some(0) => return Err(LineItemError::ZeroQuantity(item_id)),
            Some(n) => n,
        };

        Ok(Self {
            item_id,
            owner_id,
            quantity,
            unit_price,
            presentation: PresentationFields {
                name: raw.name.unwrap_or_default(),
                image_url: raw.image_url,
                unit: raw.unit,
                min_order: raw.min_order,
                stock: raw.stock,
            },
        })
    }
}
