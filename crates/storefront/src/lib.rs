//! Creamery Storefront library.
//!
//! The client-side half of the storefront: an identity-partitioned cart that
//! persists to a durable key-value store, the identity resolution it shares
//! with checkout, the checkout state machine, and the HTTP client that
//! submits orders.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
