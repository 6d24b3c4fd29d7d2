//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `identity` - Who the current user is (cached profile, session token)
//! - `cart` - The identity-partitioned cart store
//! - `checkout` - Address, review and payment state machine
//! - `api` - HTTP client for orders, profiles and products

pub mod api;
pub mod cart;
pub mod checkout;
pub mod identity;

pub use api::{ApiClient, ApiError};
pub use cart::{CartSnapshot, CartStore, SubscriptionId};
pub use checkout::{
    Checkout, CheckoutError, CheckoutStep, DeliveryDetails, OrderSubmitter, StepError,
    ValidationError,
};
pub use identity::{IdentityResolver, TokenClaims, TokenError, decode_token_claims};
