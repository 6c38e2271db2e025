//! Offline signature payloads.
//!
//! The server returns offline data as newline separated text:
//!
//! ```text
//! {payload, possibly multi-line}
//! {nonce}
//! {signing key}{ECDSA signature}
//! ```
//!
//! The signature covers `{payload}\n{nonce}\n{signing key}`.

use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};

/// Server key that signed the offline data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigningKey {
    /// Master server key, used for non-personalized data.
    #[serde(rename = "0")]
    ServerMasterPrivate,
    /// Activation specific server key.
    #[serde(rename = "1")]
    ServerPrivate,
}

impl SigningKey {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(SigningKey::ServerMasterPrivate),
            '1' => Some(SigningKey::ServerPrivate),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            SigningKey::ServerMasterPrivate => '0',
            SigningKey::ServerPrivate => '1',
        }
    }
}

/// Components extracted from `offline_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedOfflineData {
    pub data: String,
    pub nonce: String,
    pub signing_key: SigningKey,
    pub signature: String,
    /// Exact string covered by `signature`.
    pub signed_data: String,
}

/// Offline data as returned by the server, plus its parsed form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOfflinePayload {
    pub offline_data: String,
    #[serde(default)]
    pub nonce: String,
    #[serde(skip)]
    pub parsed: Option<ParsedOfflineData>,
}

impl SignedOfflinePayload {
    pub fn new(offline_data: impl Into<String>, nonce: impl Into<String>) -> Self {
        Self {
            offline_data: offline_data.into(),
            nonce: nonce.into(),
            parsed: None,
        }
    }

    /// Parse `offline_data` and fill `parsed`.
    ///
    /// Input with two lines or fewer is left unparsed without an error.
    // TODO: decide with server owners whether short input should be rejected
    // once it is known no caller relies on the silent pass-through.
    pub fn parse(mut self) -> CoreResult<Self> {
        self.parsed = parse_offline_data(&self.offline_data)?;
        Ok(self)
    }
}

pub fn parse_offline_data(offline_data: &str) -> CoreResult<Option<ParsedOfflineData>> {
    let lines: Vec<&str> = offline_data.split('\n').collect();
    let count = lines.len();
    if count <= 2 {
        return Ok(None);
    }

    let nonce = lines[count - 2];
    let last = lines[count - 1];
    let mut chars = last.chars();
    let key_char = chars.next();
    let signing_key = key_char.and_then(SigningKey::from_char).ok_or_else(|| {
        CoreError::invalid(
            "signing_key",
            format!("unsupported signing key {}", key_char.map(String::from).unwrap_or_default()),
        )
    })?;
    let signature = chars.as_str();
    let data = lines[..count - 2].join("\n");
    let signed_data = format!("{}\n{}\n{}", data, nonce, signing_key.as_char());

    Ok(Some(ParsedOfflineData {
        data,
        nonce: nonce.to_string(),
        signing_key,
        signature: signature.to_string(),
        signed_data,
    }))
}
