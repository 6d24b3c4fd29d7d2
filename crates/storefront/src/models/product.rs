//! Catalog products and the quantity policy applied before adding to a cart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use creamery_core::ProductId;

use super::lenient;

/// Why an inbound product record was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProductError {
    #[error("product has no identifier (expected id, _id or productId)")]
    MissingIdentifier,

    #[error("product {0} has no price")]
    MissingPrice(ProductId),
}

/// Why a requested quantity is not acceptable for a product.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum QuantityError {
    #[error("This product is out of stock")]
    OutOfStock,

    #[error("Only {available} available")]
    ExceedsStock { available: u32 },

    #[error("Minimum order quantity is {minimum}")]
    BelowMinimum { minimum: u32 },
}

/// A catalog product as returned by the products API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawProduct")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_order: Option<u32>,
    /// `None` when the API does not track stock for this product.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

impl Product {
    /// Quantity a product page starts at: the minimum order, at least 1.
    #[must_use]
    pub fn default_quantity(&self) -> u32 {
        self.min_order.unwrap_or(1).max(1)
    }

    /// Check a requested quantity against stock and minimum order.
    ///
    /// # Errors
    ///
    /// Returns the first rule the quantity breaks, checking stock first.
    pub fn check_quantity(&self, quantity: u32) -> Result<(), QuantityError> {
        if let Some(stock) = self.stock {
            if stock == 0 {
                return Err(QuantityError::OutOfStock);
            }
            if quantity > stock {
                return Err(QuantityError::ExceedsStock { available: stock });
            }
        }
        let minimum = self.default_quantity();
        if quantity < minimum {
            return Err(QuantityError::BelowMinimum { minimum });
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProduct {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, rename = "_id")]
    mongo_id: Option<Value>,
    #[serde(default)]
    product_id: Option<Value>,
    #[serde(default, deserialize_with = "lenient::string")]
    name: Option<String>,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::string")]
    image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    unit: Option<String>,
    #[serde(default, deserialize_with = "lenient::count")]
    min_order: Option<u32>,
    #[serde(default, deserialize_with = "lenient::count")]
    stock: Option<u32>,
}

impl TryFrom<RawProduct> for Product {
    type Error = ProductError;

    fn try_from(raw: RawProduct) -> Result<Self, Self::Error> {
        let id = [&raw.id, &raw.mongo_id, &raw.product_id]
            .into_iter()
            .flatten()
            .find_map(ProductId::from_json)
            .ok_or(ProductError::MissingIdentifier)?;
        let price = raw
            .price
            .ok_or_else(|| ProductError::MissingPrice(id.clone()))?;

        Ok(Self {
            id,
            name: raw.name.unwrap_or_default(),
            price,
            image_url: raw.image_url,
            unit: raw.unit,
            min_order: raw.min_order,
            stock: raw.stock,
        })
    }
}
