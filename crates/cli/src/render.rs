//! Terminal rendering of cart snapshots.
//!
//! The CLI is a presentation surface like any other: it subscribes to the
//! cart store and redraws the badge from whatever snapshot it is handed.

#![allow(clippy::print_stdout)]

use rust_decimal::Decimal;

use creamery_core::{CurrencyCode, Price};
use creamery_storefront::services::{CartSnapshot, CartStore, SubscriptionId};

/// `₹71.98`
pub fn money(amount: Decimal) -> String {
    Price::new(amount, CurrencyCode::default()).display()
}

/// One-line summary, e.g. `[cart] 3 items · ₹107.97`.
pub fn badge(snapshot: &CartSnapshot) -> String {
    let noun = if snapshot.item_count == 1 { "item" } else { "items" };
    let drawer = if snapshot.is_open { " (open)" } else { "" };
    format!(
        "[cart] {} {noun} · {}{drawer}",
        snapshot.item_count,
        money(snapshot.total)
    )
}

/// Print the badge after every cart change.
pub fn attach_badge(cart: &CartStore) -> SubscriptionId {
    cart.subscribe(|snapshot| println!("{}", badge(snapshot)))
}

/// Print every visible line and the totals.
pub fn print_cart(snapshot: &CartSnapshot) {
    match &snapshot.owner {
        Some(owner) => println!("Cart for user {owner}"),
        None => println!("Cart (not signed in)"),
    }

    if snapshot.is_empty() {
        println!("  Your cart is empty");
        return;
    }

    for item in &snapshot.items {
        let name = if item.presentation.name.is_empty() {
            item.item_id.as_str()
        } else {
            item.presentation.name.as_str()
        };
        let unit = item
            .presentation
            .unit
            .as_deref()
            .map(|u| format!(" / {u}"))
            .unwrap_or_default();
        println!(
            "  {:<12} {:<28} {:>4} x {}{unit} = {}",
            item.item_id.as_str(),
            name,
            item.quantity,
            money(item.unit_price),
            money(item.line_total()),
        );
        if !item.meets_minimum()
            && let Some(minimum) = item.presentation.min_order
        {
            println!("               below minimum order of {minimum}");
        }
    }
    println!("  Total: {} ({} items)", money(snapshot.total), snapshot.item_count);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(item_count: u64, total: Decimal, is_open: bool) -> CartSnapshot {
        CartSnapshot {
            owner: None,
            items: Vec::new(),
            item_count,
            total,
            is_open,
        }
    }

    #[test]
    fn test_badge() {
        assert_eq!(
            badge(&snapshot(2, Decimal::new(7198, 2), false)),
            "[cart] 2 items · ₹71.98"
        );
        assert_eq!(
            badge(&snapshot(1, Decimal::new(5, 0), true)),
            "[cart] 1 item · ₹5.00 (open)"
        );
    }
}
