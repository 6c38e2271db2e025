//! Wire shape of ECIES cryptograms.
//!
//! Binary fields travel as standard base64 inside JSON objects. Newer server
//! APIs use `ephemeralPublicKey`/`encryptedData`, the SDK-level shape uses
//! `key`/`body`; both are accepted on input, the newer names are emitted.

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use pa_crypto::{Cryptogram, Decryptor, Encryptor, ResponseDecryptor, ResponseEncryptor};

use crate::errors::{CoreError, CoreResult};

/// Request leg: carries the ephemeral key and nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedRequest {
    #[serde(alias = "key")]
    pub ephemeral_public_key: String,
    #[serde(alias = "body")]
    pub encrypted_data: String,
    pub mac: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// Response leg: ciphertext and MAC only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedResponse {
    #[serde(alias = "body")]
    pub encrypted_data: String,
    pub mac: String,
}

impl EncryptedRequest {
    pub fn from_cryptogram(c: &Cryptogram) -> CoreResult<Self> {
        let key = c
            .ephemeral_public_key
            .as_deref()
            .ok_or_else(|| CoreError::Format("request cryptogram has no ephemeral key".into()))?;
        Ok(Self {
            ephemeral_public_key: B64.encode(key),
            encrypted_data: B64.encode(&c.body),
            mac: B64.encode(&c.mac),
            nonce: c.nonce.as_deref().map(|n| B64.encode(n)),
        })
    }

    pub fn to_cryptogram(&self) -> CoreResult<Cryptogram> {
        Ok(Cryptogram {
            body: B64.decode(&self.encrypted_data)?,
            mac: B64.decode(&self.mac)?,
            ephemeral_public_key: Some(B64.decode(&self.ephemeral_public_key)?),
            nonce: self.nonce.as_deref().map(|n| B64.decode(n)).transpose()?,
        })
    }
}

impl EncryptedResponse {
    pub fn from_cryptogram(c: &Cryptogram) -> Self {
        Self {
            encrypted_data: B64.encode(&c.body),
            mac: B64.encode(&c.mac),
        }
    }

    pub fn to_cryptogram(&self) -> CoreResult<Cryptogram> {
        Ok(Cryptogram {
            body: B64.decode(&self.encrypted_data)?,
            mac: B64.decode(&self.mac)?,
            ephemeral_public_key: None,
            nonce: None,
        })
    }
}

/// Serialize `object` as JSON and encrypt it as a request.
pub fn encrypt_request_object<T: Serialize>(
    encryptor: Encryptor,
    object: &T,
) -> CoreResult<(EncryptedRequest, ResponseDecryptor)> {
    let data = serde_json::to_vec(object)?;
    let (cryptogram, pending) = encryptor.encrypt_request(&data)?;
    Ok((EncryptedRequest::from_cryptogram(&cryptogram)?, pending))
}

/// Decrypt a response and parse its JSON payload.
pub fn decrypt_response_object<T: DeserializeOwned>(
    pending: ResponseDecryptor,
    response: &EncryptedResponse,
) -> CoreResult<T> {
    let data = pending.decrypt_response(&response.to_cryptogram()?)?;
    Ok(serde_json::from_slice(&data)?)
}

/// Server side: decrypt a request and parse its JSON payload.
pub fn decrypt_request_object<T: DeserializeOwned>(
    decryptor: Decryptor,
    request: &EncryptedRequest,
) -> CoreResult<(T, ResponseEncryptor)> {
    let (data, responder) = decryptor.decrypt_request(&request.to_cryptogram()?)?;
    Ok((serde_json::from_slice(&data)?, responder))
}

/// Server side: serialize and encrypt a response.
pub fn encrypt_response_object<T: Serialize>(
    responder: ResponseEncryptor,
    object: &T,
) -> CoreResult<EncryptedResponse> {
    let data = serde_json::to_vec(object)?;
    Ok(EncryptedResponse::from_cryptogram(&responder.encrypt_response(&data)?))
}
