//! Session commands.
//!
//! Sign-in itself happens elsewhere; these commands only place what the
//! auth service issued into storage, where the identity resolver reads it.

#![allow(clippy::print_stdout)]

use creamery_storefront::error::{AppError, clear_sentry_user, set_sentry_user};
use creamery_storefront::models::UserProfile;
use creamery_storefront::services::decode_token_claims;
use creamery_storefront::state::AppState;
use creamery_storefront::storage::{KeyValueStore as _, keys};

/// Store a session token and, optionally, a profile to cache.
///
/// # Errors
///
/// Returns an error if the token or profile is malformed, or storage fails.
pub fn login(state: &AppState, token: &str, profile: Option<&str>) -> Result<(), AppError> {
    let claims = decode_token_claims(token)
        .map_err(|e| AppError::BadRequest(format!("invalid session token: {e}")))?;

    let store = state.store();
    store.set(keys::TOKEN, token.trim())?;
    match profile {
        Some(raw) => {
            serde_json::from_str::<UserProfile>(raw)
                .map_err(|e| AppError::BadRequest(format!("invalid profile JSON: {e}")))?;
            store.set(keys::USER, raw)?;
        }
        None => store.remove(keys::USER)?,
    }

    match state.identity().resolve() {
        Some(user_id) => {
            set_sentry_user(&user_id, claims.email.as_deref());
            tracing::info!(user_id = %user_id, "Signed in");
            println!("Signed in as {user_id}");
        }
        None => println!("Token stored, but it carries no user id"),
    }
    Ok(())
}

/// Remove the session token and cached profile.
///
/// Cart partitions are kept; signing in again brings the cart back.
///
/// # Errors
///
/// Returns an error if storage fails.
pub fn logout(state: &AppState) -> Result<(), AppError> {
    let store = state.store();
    store.remove(keys::TOKEN)?;
    store.remove(keys::USER)?;
    clear_sentry_user();
    println!("Signed out");
    Ok(())
}

pub fn whoami(state: &AppState) {
    let identity = state.identity();
    match identity.resolve() {
        Some(user_id) => println!("User: {user_id}"),
        None => println!("Not signed in"),
    }
    if let Some(claims) = identity.claims() {
        if let Some(email) = claims.email {
            println!("Email: {email}");
        }
        if let Some(role) = claims.role {
            println!("Role: {role}");
        }
    }
}
