//! PA Core - PowerAuth test harness building blocks.
//!
//! This crate implements:
//! - A simulated mobile client running the activation key exchange
//! - An in-process server simulator for the other side of it
//! - Base64 JSON shapes of ECIES cryptograms
//! - Normalized signature data and `PowerAuth` header parsers
//! - Offline signature payload parsing
//! - Harness configuration

#![forbid(unsafe_code)]

// State machine
pub mod client;
pub mod harness;

// Wire formats
pub mod cryptogram;
pub mod header;
pub mod offline;
pub mod signature;

// Supporting modules
pub mod config;
pub mod errors;

#[cfg(test)]
mod proptests;

pub use client::{ActivationMaterial, ActivationState, CreateActivationData, MobileClient};
pub use config::{ApplicationSetup, ConfigError, HarnessConfig};
pub use cryptogram::{EncryptedRequest, EncryptedResponse};
pub use errors::{CoreError, CoreResult};
pub use harness::ServerSimulator;
pub use header::{parse_signature_header, parse_token_header, OnlineSignature, TokenDigest};
pub use offline::{SignedOfflinePayload, SigningKey};
