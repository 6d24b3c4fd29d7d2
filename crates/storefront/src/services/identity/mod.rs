//! Identity resolution.
//!
//! Works out who the current user is from what the sign-in flow left in
//! storage: a cached profile under `user` and a JWT under `token`. The
//! signature is never verified; the token is only read for its claims.

mod error;

pub use error::TokenError;

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use creamery_core::UserId;

use crate::models::{UserProfile, lenient};
use crate::storage::{KeyValueStore, keys};

/// base64url that tolerates both padded and unpadded input.
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Claims read from a session token's payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenClaims {
    /// `userId`, then `id`, then `sub`.
    pub user_id: Option<UserId>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClaims {
    #[serde(default)]
    user_id: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default, deserialize_with = "lenient::string")]
    email: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    role: Option<String>,
}

/// Decode the payload segment of a JWT.
///
/// # Errors
///
/// Returns `TokenError` if the token has no payload segment, the segment is
/// not base64url, or the decoded bytes are not a JSON object.
pub fn decode_token_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let payload = token
        .trim()
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or(TokenError::MissingPayload)?;

    let bytes = TOKEN_ENGINE.decode(payload)?;
    let raw: RawClaims = serde_json::from_slice(&bytes)?;

    let user_id = [&raw.user_id, &raw.id, &raw.sub]
        .into_iter()
        .flatten()
        .find_map(UserId::from_json);

    Ok(TokenClaims {
        user_id,
        email: raw.email,
        role: raw.role,
    })
}

/// Reads the current identity out of a [`KeyValueStore`].
///
/// Nothing is cached: every call reads storage, so sign-in and sign-out by
/// another component take effect on the next call.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityResolver").finish_non_exhaustive()
    }
}

impl IdentityResolver {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Resolve the current user's identifier.
    ///
    /// Uses the cached profile's `id`/`_id` when present, otherwise the
    /// session token's user claim. `None` means anonymous.
    #[must_use]
    pub fn resolve(&self) -> Option<UserId> {
        if let Some(id) = self.profile().and_then(|profile| profile.user_id()) {
            return Some(id);
        }
        self.claims().and_then(|claims| claims.user_id)
    }

    /// The cached profile record, if one is stored and parses.
    #[must_use]
    pub fn profile(&self) -> Option<UserProfile> {
        let raw = self.read(keys::USER)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed cached profile");
                None
            }
        }
    }

    /// Claims of the stored session token, if one is stored and decodes.
    #[must_use]
    pub fn claims(&self) -> Option<TokenClaims> {
        let token = self.read(keys::TOKEN)?;
        match decode_token_claims(&token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable session token");
                None
            }
        }
    }

    /// The raw session token, for bearer authentication.
    #[must_use]
    pub fn session_token(&self) -> Option<SecretString> {
        self.read(keys::TOKEN).map(SecretString::from)
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(e) => {
                debug!(key, error = %e, "Identity source unreadable");
                None
            }
        }
    }
}
