//! Parsers for `PowerAuth` HTTP authorization headers.
//!
//! Both the signature header and the token header share one shape:
//! `PowerAuth key1="value1", key2="value2", ...`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};

pub const HEADER_MAGIC: &str = "PowerAuth ";

/// Online signature as produced by the mobile SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineSignature {
    pub activation_id: String,
    pub application_key: String,
    pub signature: String,
    /// Always upper case, e.g. `POSSESSION_KNOWLEDGE`.
    pub signature_type: String,
    pub signature_version: String,
    pub nonce: String,
}

/// Token digest as produced by the mobile SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDigest {
    pub version: String,
    pub token_id: String,
    pub token_digest: String,
    pub nonce: String,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
}

/// Split a header into its quoted key/value components.
fn parse_components(header: &str) -> CoreResult<HashMap<&str, &str>> {
    let body = header
        .strip_prefix(HEADER_MAGIC)
        .ok_or_else(|| CoreError::Format("header must begin with PowerAuth".into()))?;

    let mut components = HashMap::new();
    for key_value in body.split(", ") {
        let (key, value) = key_value
            .split_once('=')
            .ok_or_else(|| CoreError::Format(format!("unknown component in header: {key_value}")))?;
        // A lone `"` both opens and closes the value, leaving it empty.
        let value = match value.strip_prefix('"') {
            Some("") => "",
            Some(rest) => rest.strip_suffix('"').ok_or_else(|| {
                CoreError::Format(format!("value is not quoted: {key_value}"))
            })?,
            None => return Err(CoreError::Format(format!("value is not quoted: {key_value}"))),
        };
        components.insert(key, value);
    }
    Ok(components)
}

fn required(components: &HashMap<&str, &str>, key: &str, context: &str) -> CoreResult<String> {
    match components.get(key) {
        Some(v) if !v.is_empty() => Ok((*v).to_string()),
        _ => Err(CoreError::missing(key, context)),
    }
}

/// Parse a signature header. The application key is not part of the header
/// and comes from the application setup.
pub fn parse_signature_header(header: &str, app_key: &str) -> CoreResult<OnlineSignature> {
    const CONTEXT: &str = "PA signature";
    let c = parse_components(header)?;
    let signature_version = required(&c, "pa_version", CONTEXT)?;
    let activation_id = required(&c, "pa_activation_id", CONTEXT)?;
    let nonce = required(&c, "pa_nonce", CONTEXT)?;
    let signature_type = required(&c, "pa_signature_type", CONTEXT)?;
    let signature = required(&c, "pa_signature", CONTEXT)?;
    Ok(OnlineSignature {
        activation_id,
        application_key: app_key.to_string(),
        signature,
        signature_type: signature_type.to_uppercase(),
        signature_version,
        nonce,
    })
}

pub fn parse_token_header(header: &str) -> CoreResult<TokenDigest> {
    const CONTEXT: &str = "token header";
    let c = parse_components(header)?;
    let version = required(&c, "version", CONTEXT)?;
    let token_id = required(&c, "token_id", CONTEXT)?;
    let token_digest = required(&c, "token_digest", CONTEXT)?;
    let nonce = required(&c, "nonce", CONTEXT)?;
    let timestamp = required(&c, "timestamp", CONTEXT)?
        .parse::<i64>()
        .map_err(|_| CoreError::invalid("timestamp", "invalid timestamp value in token header"))?;
    Ok(TokenDigest {
        version,
        token_id,
        token_digest,
        nonce,
        timestamp,
    })
}
