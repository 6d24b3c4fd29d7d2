//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! creamery cart show
//! creamery cart add 65f0c0ffee --quantity 4
//! creamery cart add p-ghee --price 35.99 --name "Ghee 500ml"
//! creamery cart set 65f0c0ffee 2
//! creamery cart remove 65f0c0ffee
//! creamery cart clear
//! ```

use rust_decimal::Decimal;

use creamery_core::ProductId;
use creamery_storefront::error::{AppError, add_breadcrumb};
use creamery_storefront::models::{CartEntry, PresentationFields};
use creamery_storefront::state::AppState;

use crate::render;

pub fn show(state: &AppState) {
    render::print_cart(&state.cart().snapshot());
}

/// Add a product to the cart.
///
/// Without `price` the product is fetched from the API and the quantity is
/// checked against its stock and minimum order first.
///
/// # Errors
///
/// Returns an error if the lookup fails or the quantity is not allowed.
pub async fn add(
    state: &AppState,
    product_id: &str,
    quantity: Option<u32>,
    price: Option<Decimal>,
    name: Option<String>,
) -> Result<(), AppError> {
    let id = ProductId::new(product_id.trim());
    if id.as_str().is_empty() {
        return Err(AppError::BadRequest("product id cannot be empty".to_string()));
    }

    let (entry, quantity) = if let Some(unit_price) = price {
        let entry = CartEntry {
            item_id: id,
            unit_price,
            presentation: PresentationFields {
                name: name.unwrap_or_default(),
                ..PresentationFields::default()
            },
        };
        (entry, quantity.unwrap_or(1))
    } else {
        let product = state.api().get_product(&id).await?;
        let quantity = quantity.unwrap_or_else(|| product.default_quantity());
        product.check_quantity(quantity)?;
        (CartEntry::from(&product), quantity)
    };

    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", entry.item_id.as_str())]));
    let subscription = render::attach_badge(state.cart());
    state.cart().add_item(entry, quantity);
    state.cart().unsubscribe(subscription);
    Ok(())
}

pub fn remove(state: &AppState, product_id: &str) {
    let subscription = render::attach_badge(state.cart());
    state.cart().remove_item(&ProductId::new(product_id.trim()));
    state.cart().unsubscribe(subscription);
}

pub fn set(state: &AppState, product_id: &str, quantity: i64) {
    let subscription = render::attach_badge(state.cart());
    state
        .cart()
        .set_quantity(&ProductId::new(product_id.trim()), quantity);
    state.cart().unsubscribe(subscription);
}

pub fn clear(state: &AppState) {
    let subscription = render::attach_badge(state.cart());
    state.cart().clear();
    state.cart().unsubscribe(subscription);
}

/// The drawer flag lives for one process, so this only shows the flip.
pub fn toggle(state: &AppState) {
    let subscription = render::attach_badge(state.cart());
    state.cart().toggle_visibility();
    state.cart().unsubscribe(subscription);
}
