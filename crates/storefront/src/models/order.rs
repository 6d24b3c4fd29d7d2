//! Order submission payloads and the API's confirmation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use creamery_core::{OrderId, OrderStatus, PaymentDetails, PaymentMethod, ProductId, UserId};

use super::CartLineItem;
use super::lenient;

/// Body of `POST /orders`.
///
/// Decimals go out as JSON numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub delivery_address: DeliveryAddress,
    pub payment_method: PaymentMethod,
    pub payment_details: PaymentDetails,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<&CartLineItem> for OrderItem {
    fn from(item: &CartLineItem) -> Self {
        Self {
            product_id: item.item_id.clone(),
            name: item.presentation.name.clone(),
            price: item.unit_price,
            quantity: item.quantity,
            image_url: item.presentation.image_url.clone(),
        }
    }
}

/// Validated delivery address as sent to the orders API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryAddress {
    /// First and last name joined by a space.
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

/// What the orders API returns for an accepted order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawConfirmation")]
pub struct OrderConfirmation {
    pub id: OrderId,
    pub order_number: Option<String>,
    pub status: OrderStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl OrderConfirmation {
    /// Number to show the buyer: `orderNumber` when present, else the id.
    #[must_use]
    pub fn reference(&self) -> &str {
        self.order_number.as_deref().unwrap_or(self.id.as_str())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfirmation {
    #[serde(default, rename = "_id")]
    mongo_id: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, deserialize_with = "lenient::string")]
    order_number: Option<String>,
    #[serde(default)]
    status: Option<OrderStatus>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<RawConfirmation> for OrderConfirmation {
    type Error = &'static str;

    fn try_from(raw: RawConfirmation) -> Result<Self, Self::Error> {
        let id = [&raw.mongo_id, &raw.id]
            .into_iter()
            .flatten()
            .find_map(OrderId::from_json)
            .ok_or("order response has no _id or id")?;
        Ok(Self {
            id,
            order_number: raw.order_number,
            status: raw.status.unwrap_or_default(),
            created_at: raw.created_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = OrderRequest {
            user_id: UserId::new("u1"),
            items: vec![OrderItem {
                product_id: ProductId::new("p1"),
                name: "Paneer".to_string(),
                price: Decimal::new(3599, 2),
                quantity: 2,
                image_url: None,
            }],
            total: Decimal::new(7198, 2),
            delivery_address: DeliveryAddress {
                name: "Asha Rao".to_string(),
                email: "asha@dairy.co".to_string(),
                phone: "9876543210".to_string(),
                address: "12 MG Road".to_string(),
                city: "Bengaluru".to_string(),
                state: "KA".to_string(),
                pincode: "560001".to_string(),
            },
            payment_method: PaymentMethod::CashOnDelivery,
            payment_details: PaymentDetails::default(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["total"], json!(71.98));
        assert_eq!(value["items"][0]["productId"], "p1");
        assert_eq!(value["items"][0]["price"], json!(35.99));
        assert!(value["items"][0].get("imageUrl").is_none());
        assert_eq!(value["deliveryAddress"]["name"], "Asha Rao");
        assert_eq!(value["paymentMethod"], "cod");
        assert_eq!(value["paymentDetails"], json!({}));
    }

    #[test]
    fn test_confirmation_prefers_mongo_id() {
        let c: OrderConfirmation = serde_json::from_value(json!({
            "_id": "ord_1",
            "id": "other",
            "status": "Pending",
            "createdAt": "2026-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(c.id.as_str(), "ord_1");
        assert_eq!(c.status, OrderStatus::Pending);
        assert!(c.created_at.is_some());
        assert_eq!(c.reference(), "ord_1");
    }

    #[test]
    fn test_confirmation_order_number() {
        let c: OrderConfirmation =
            serde_json::from_value(json!({"id": 99, "orderNumber": "ORD-0099"})).unwrap();
        assert_eq!(c.id.as_str(), "99");
        assert_eq!(c.reference(), "ORD-0099");
    }

    #[test]
    fn test_confirmation_without_id_rejected() {
        assert!(serde_json::from_value::<OrderConfirmation>(json!({"message": "ok"})).is_err());
    }
}
