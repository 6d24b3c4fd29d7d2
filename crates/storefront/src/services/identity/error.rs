//! Identity resolution error types.

use thiserror::Error;

/// Errors that can occur when decoding a session token's payload.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token has no second dot-separated segment.
    #[error("token has no payload segment")]
    MissingPayload,

    /// The payload segment is not base64url.
    #[error("token payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded payload is not a JSON object.
    #[error("token payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
