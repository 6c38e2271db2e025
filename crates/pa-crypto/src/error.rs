//! Crypto error types.

use thiserror::Error;

/// Errors raised by the crypto core.
///
/// Every failure is reported to the immediate caller; no operation returns a
/// partially computed result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key, IV or secret of the wrong size, or an impossible output length.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// MAC verification failed.
    #[error("authentication failed: MAC mismatch")]
    Authentication,

    /// Malformed cryptogram or bad padding.
    #[error("format error: {0}")]
    Format(String),

    /// Public point not on the curve, identity point, or invalid scalar.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl CryptoError {
    pub(crate) fn bad_length(what: &str, expected: usize, got: usize) -> Self {
        CryptoError::Configuration(format!(
            "invalid {what} length: expected {expected}, got {got}"
        ))
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
