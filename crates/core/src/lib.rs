//! Creamery Core - Shared types library.
//!
//! This crate provides common types used across all Creamery components:
//! - `storefront` - Cart, identity, and checkout library
//! - `cli` - Command-line driver for the cart and checkout flow
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, statuses and payment methods

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
