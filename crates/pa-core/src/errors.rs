//! Error types for the harness core.
//!
//! One taxonomy covers crypto failures, wire decoding, header parsing and
//! client state transitions. Crypto errors map onto it one-to-one.

use pa_crypto::CryptoError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Bad key, IV or secret size; unusable setup values.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// MAC mismatch while decrypting.
    #[error("authentication failed: MAC mismatch")]
    Authentication,

    /// Malformed header token, bad padding, undecodable base64 or JSON.
    #[error("format error: {0}")]
    Format(String),

    /// A required field is missing or carries an unacceptable value.
    #[error("validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Operation not allowed in the current client state.
    #[error("invalid state: {0}")]
    State(String),

    /// Public key not on the curve or identity element.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl CoreError {
    pub fn missing(field: &str, context: &str) -> Self {
        CoreError::Validation {
            field: field.to_string(),
            reason: format!("missing in {context}"),
        }
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field for validation errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            CoreError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<CryptoError> for CoreError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Configuration(s) => CoreError::Configuration(s),
            CryptoError::Authentication => CoreError::Authentication,
            CryptoError::Format(s) => CoreError::Format(s),
            CryptoError::InvalidKey(s) => CoreError::InvalidKey(s),
        }
    }
}

impl From<base64::DecodeError> for CoreError {
    fn from(e: base64::DecodeError) -> Self {
        CoreError::Format(format!("invalid base64: {e}"))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Format(format!("invalid JSON: {e}"))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
