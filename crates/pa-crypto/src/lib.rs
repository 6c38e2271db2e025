#![forbid(unsafe_code)]

//! Mobile-side cryptography of the PowerAuth protocol.
//!
//! Everything here is synchronous and works on in-memory buffers. The crate
//! carries no logging dependency; callers decide what to report.

pub mod error;
pub mod hash;
pub mod cipher;
pub mod utils;

pub mod ec;
pub mod kdf;

pub mod envelope;
pub mod protocol;

#[cfg(test)]
mod proptests;

pub use ec::KeyPair;
pub use envelope::{
    Cryptogram, Decryptor, Encryptor, EnvelopeKey, ResponseDecryptor, ResponseEncryptor,
};
pub use error::CryptoError;
pub use protocol::{derive_all_secret_keys, SignatureKeys};
