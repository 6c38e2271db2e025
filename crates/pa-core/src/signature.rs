//! Normalized data for symmetric signature verification.
//!
//! The server recomputes a signature over
//! `METHOD & b64(uriId) & nonce & b64(body)`, so the harness must build the
//! exact same string the mobile SDK signed.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::header::OnlineSignature;

/// Body of a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    /// Raw body, typically JSON.
    Raw(String),
    /// Query parameters of a GET-like request.
    Params(BTreeMap<String, String>),
}

impl RequestBody {
    /// The string that goes into the signed data.
    pub fn normalized(&self) -> String {
        match self {
            RequestBody::Empty => String::new(),
            RequestBody::Raw(s) => s.clone(),
            RequestBody::Params(p) => normalize_get_params(Some(p)),
        }
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::Raw(s.to_string())
    }
}

impl From<BTreeMap<String, String>> for RequestBody {
    fn from(p: BTreeMap<String, String>) -> Self {
        RequestBody::Params(p)
    }
}

pub fn normalize_online_data(
    method: &str,
    uri_id: &str,
    data: Option<&str>,
    nonce_b64: &str,
) -> String {
    let uri_id_b64 = B64.encode(uri_id);
    let data_b64 = B64.encode(data.unwrap_or(""));
    [method, uri_id_b64.as_str(), nonce_b64, data_b64.as_str()].join("&")
}

/// Offline signatures are always normalized as `POST`.
pub fn normalize_offline_data(uri_id: &str, data: Option<&str>, nonce_b64: &str) -> String {
    normalize_online_data("POST", uri_id, data, nonce_b64)
}

/// Characters kept literal in parameter keys and values, as `encodeURIComponent` does.
const PARAM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// `key=value` pairs sorted by key, both sides percent-encoded, joined with `&`.
pub fn normalize_get_params(params: Option<&BTreeMap<String, String>>) -> String {
    let Some(params) = params else {
        return String::new();
    };
    params
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                utf8_percent_encode(k, PARAM_ENCODE_SET),
                utf8_percent_encode(v, PARAM_ENCODE_SET)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Input of the server's online signature verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineSignatureData {
    pub activation_id: String,
    pub application_key: String,
    pub signature: String,
    pub signature_type: String,
    pub signature_version: String,
    pub data: String,
}

impl OnlineSignatureData {
    /// Combine a parsed header with the request it was computed over.
    pub fn new(
        signature: &OnlineSignature,
        method: &str,
        uri_id: &str,
        body: &RequestBody,
    ) -> Self {
        let body = body.normalized();
        Self {
            activation_id: signature.activation_id.clone(),
            application_key: signature.application_key.clone(),
            signature: signature.signature.clone(),
            signature_type: signature.signature_type.clone(),
            signature_version: signature.signature_version.clone(),
            data: normalize_online_data(method, uri_id, Some(&body), &signature.nonce),
        }
    }
}

/// Input of the server's offline signature verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineSignatureData {
    pub activation_id: String,
    pub data: String,
    pub signature: String,
    pub allow_biometry: bool,
}

impl OfflineSignatureData {
    pub fn new(
        activation_id: &str,
        uri_id: &str,
        data: Option<&str>,
        nonce_b64: &str,
        allow_biometry: bool,
        signature: &str,
    ) -> Self {
        Self {
            activation_id: activation_id.to_string(),
            data: normalize_offline_data(uri_id, data, nonce_b64),
            signature: signature.to_string(),
            allow_biometry,
        }
    }
}
