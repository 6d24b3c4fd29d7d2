//! Checkout command.
//!
//! Runs the state machine start to finish: fill the delivery form, step
//! through review, choose payment, submit.

#![allow(clippy::print_stdout)]

use creamery_core::{PaymentDetails, PaymentMethod};
use creamery_storefront::error::{AppError, add_breadcrumb};
use creamery_storefront::services::{CheckoutStep, DeliveryDetails};
use creamery_storefront::state::AppState;

use crate::render;

/// Everything the buyer typed.
pub struct CheckoutInput {
    pub delivery: DeliveryDetails,
    pub payment: String,
    pub payment_details: PaymentDetails,
    pub prefill: bool,
}

/// Place an order for the current identity's cart.
///
/// # Errors
///
/// Returns an error if the payment method is unknown, a step refuses to
/// advance, or the API rejects the order.
pub async fn run(state: &AppState, input: CheckoutInput) -> Result<(), AppError> {
    let method: PaymentMethod = input.payment.parse()?;
    let mut checkout = state.checkout();
    *checkout.delivery_mut() = input.delivery;

    if input.prefill {
        let fetched = match state.api().fetch_profile().await {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(error = %e, "Could not fetch profile, using cached data");
                None
            }
        };
        checkout.prefill(fetched.as_ref(), state.identity().claims().as_ref());
    }

    while checkout.step() != CheckoutStep::Payment {
        println!("== {} ==", checkout.step().label());
        if checkout.step() == CheckoutStep::Review {
            render::print_cart(&state.cart().snapshot());
        }
        checkout.advance()?;
    }

    println!("== {} ==", checkout.step().label());
    checkout.set_payment_method(method);
    *checkout.payment_details_mut() = input.payment_details;
    println!("Paying by {method}");

    add_breadcrumb("checkout", "Submitting order", Some(&[("payment_method", method.code())]));
    let confirmation = checkout.submit().await?;

    println!("Order placed! Reference: {}", confirmation.reference());
    println!("Status: {}", confirmation.status.label());
    Ok(())
}
