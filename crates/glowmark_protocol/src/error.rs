//! Protocol-level errors.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Error code the server returns for an invalid or revoked token.
pub const CODE_INVALID_TOKEN: i32 = 10000;
/// Error codes the server returns for an expired subscription.
pub const CODE_EXPIRED: i32 = 10100;
/// Alternate expired-subscription code.
pub const CODE_EXPIRED_ALT: i32 = 10101;

/// Returns true if a structured error code invalidates the stored token.
///
/// These codes force re-authentication on the next attempt; retrying with
/// the same token would fail identically.
pub fn is_auth_code(code: i32) -> bool {
    matches!(code, CODE_INVALID_TOKEN | CODE_EXPIRED | CODE_EXPIRED_ALT)
}

/// Errors raised while interpreting server payloads.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The server returned a structured error code in a 200 response.
    #[error("api error {code}: {message}")]
    Api {
        /// Server error code.
        code: i32,
        /// Server-provided message, or a generic fallback.
        message: String,
    },

    /// A success envelope arrived without its `data` payload.
    #[error("response envelope is missing data")]
    MissingData,

    /// The payload could not be decoded as the expected JSON shape.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl ProtocolError {
    /// Returns true if this error should clear the stored auth token.
    pub fn invalidates_token(&self) -> bool {
        matches!(self, ProtocolError::Api { code, .. } if is_auth_code(*code))
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::Malformed(e.to_string())
    }
}
