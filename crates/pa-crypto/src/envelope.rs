//! ECIES envelope encryption.
//!
//! P-256 ECDH + X9.63 KDF (SHA-256) + AES-128-CBC/PKCS#7 + HMAC-SHA256, as
//! used by the mobile SDK for request/response pairs.
//!
//! One request and its response form an exchange. Each role object is
//! consumed by the single operation it supports, so an envelope key can never
//! be applied to a second exchange:
//!
//! ```text
//! client: Encryptor --encrypt_request--> ResponseDecryptor --decrypt_response--> done
//! server: Decryptor --decrypt_request--> ResponseEncryptor --encrypt_response--> done
//! ```

use std::fmt;

use p256::PublicKey;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::cipher::{aes128_cbc_decrypt, aes128_cbc_encrypt};
use crate::ec::{parse_public_key, shared_secret, KeyPair};
use crate::error::{CryptoError, CryptoResult};
use crate::hash::hmac_sha256_full;
use crate::kdf::{derive_secret_key_from_index, kdf_x963_sha256, KEY_LENGTH};
use crate::utils::{concat, constant_time_compare};

/// Size of the derived envelope key (three 16-byte sub-keys).
pub const ENVELOPE_KEY_SIZE: usize = 3 * KEY_LENGTH;
/// Size of the per-request nonce.
pub const NONCE_LENGTH: usize = 16;

/// Symmetric keys derived for one ECIES exchange.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EnvelopeKey {
    enc_key: [u8; KEY_LENGTH],
    mac_key: [u8; KEY_LENGTH],
    iv_key: [u8; KEY_LENGTH],
    ephemeral_public_key: Vec<u8>,
}

impl EnvelopeKey {
    fn from_derived(key: &[u8], ephemeral_public_key: Vec<u8>) -> Self {
        debug_assert_eq!(key.len(), ENVELOPE_KEY_SIZE);
        let mut enc_key = [0u8; KEY_LENGTH];
        let mut mac_key = [0u8; KEY_LENGTH];
        let mut iv_key = [0u8; KEY_LENGTH];
        enc_key.copy_from_slice(&key[..KEY_LENGTH]);
        mac_key.copy_from_slice(&key[KEY_LENGTH..2 * KEY_LENGTH]);
        iv_key.copy_from_slice(&key[2 * KEY_LENGTH..]);
        Self { enc_key, mac_key, iv_key, ephemeral_public_key }
    }

    fn derive(secret: &[u8], shared_info1: &[u8], ephemeral_public_key: Vec<u8>) -> Self {
        let info1 = concat(&[shared_info1, ephemeral_public_key.as_slice()]);
        let key = Zeroizing::new(kdf_x963_sha256(secret, &info1, ENVELOPE_KEY_SIZE));
        Self::from_derived(&key, ephemeral_public_key)
    }

    /// Sender side: ECDH between `ephemeral` and the recipient's public key.
    /// The compressed ephemeral public key is bound into the KDF info.
    pub fn from_public_key(
        ephemeral: &KeyPair,
        recipient: &PublicKey,
        shared_info1: &[u8],
    ) -> Self {
        let secret = shared_secret(ephemeral, recipient);
        Self::derive(secret.as_slice(), shared_info1, ephemeral.public_key(true))
    }

    /// Recipient side: ECDH between our key pair and the received ephemeral
    /// public key, bound into the KDF exactly as received.
    pub fn from_private_key(
        key_pair: &KeyPair,
        ephemeral_public_key: &[u8],
        shared_info1: &[u8],
    ) -> CryptoResult<Self> {
        let secret = key_pair.shared_secret(ephemeral_public_key)?;
        Ok(Self::derive(secret.as_slice(), shared_info1, ephemeral_public_key.to_vec()))
    }

    /// IV for this exchange: `reduce(HMAC-SHA256(iv_key, nonce))`.
    pub fn derive_iv_for_nonce(&self, nonce: &[u8]) -> CryptoResult<[u8; KEY_LENGTH]> {
        derive_secret_key_from_index(&self.iv_key, nonce)
    }

    pub fn enc_key(&self) -> &[u8; KEY_LENGTH] {
        &self.enc_key
    }

    pub fn mac_key(&self) -> &[u8; KEY_LENGTH] {
        &self.mac_key
    }

    pub fn iv_key(&self) -> &[u8; KEY_LENGTH] {
        &self.iv_key
    }

    pub fn ephemeral_public_key(&self) -> &[u8] {
        &self.ephemeral_public_key
    }
}

impl fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeKey")
            .field("ephemeral_public_key", &self.ephemeral_public_key)
            .finish_non_exhaustive()
    }
}

/// Binary ECIES cryptogram.
///
/// `ephemeral_public_key` and `nonce` travel only with requests; a response
/// reuses the key and IV established by its request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cryptogram {
    pub body: Vec<u8>,
    pub mac: Vec<u8>,
    pub ephemeral_public_key: Option<Vec<u8>>,
    pub nonce: Option<Vec<u8>>,
}

fn seal(
    key: &EnvelopeKey,
    shared_info2: &[u8],
    iv: &[u8],
    data: &[u8],
) -> CryptoResult<(Vec<u8>, Vec<u8>)> {
    let body = aes128_cbc_encrypt(&key.enc_key, iv, data)?;
    let mac = hmac_sha256_full(&key.mac_key, &concat(&[body.as_slice(), shared_info2]))?;
    Ok((body, mac.to_vec()))
}

fn open(
    key: &EnvelopeKey,
    shared_info2: &[u8],
    iv: &[u8],
    cryptogram: &Cryptogram,
) -> CryptoResult<Vec<u8>> {
    let expected = hmac_sha256_full(
        &key.mac_key,
        &concat(&[cryptogram.body.as_slice(), shared_info2]),
    )?;
    if !constant_time_compare(&expected, &cryptogram.mac) {
        return Err(CryptoError::Authentication);
    }
    aes128_cbc_decrypt(&key.enc_key, iv, &cryptogram.body)
}

/// Client-side encryptor bound to the server's public key and the two
/// shared-info values of one channel.
#[derive(Debug, Clone)]
pub struct Encryptor {
    public_key: PublicKey,
    shared_info1: Vec<u8>,
    shared_info2: Vec<u8>,
}

impl Encryptor {
    /// Fails with `InvalidKey` when `public_key` is not a P-256 point.
    pub fn new(public_key: &[u8], shared_info1: &[u8], shared_info2: &[u8]) -> CryptoResult<Self> {
        Ok(Self {
            public_key: parse_public_key(public_key)?,
            shared_info1: shared_info1.to_vec(),
            shared_info2: shared_info2.to_vec(),
        })
    }

    /// Encrypt a request with a fresh ephemeral key pair and random nonce.
    ///
    /// Returns the request cryptogram and the only object able to decrypt
    /// the matching response.
    pub fn encrypt_request(
        self,
        plaintext: &[u8],
    ) -> CryptoResult<(Cryptogram, ResponseDecryptor)> {
        let ephemeral = KeyPair::generate();
        let mut nonce = [0u8; NONCE_LENGTH];
        getrandom::getrandom(&mut nonce)
            .map_err(|e| CryptoError::Configuration(format!("random source failed: {e}")))?;
        self.encrypt_request_with(&ephemeral, &nonce, plaintext)
    }

    pub(crate) fn encrypt_request_with(
        self,
        ephemeral: &KeyPair,
        nonce: &[u8; NONCE_LENGTH],
        plaintext: &[u8],
    ) -> CryptoResult<(Cryptogram, ResponseDecryptor)> {
        let envelope_key =
            EnvelopeKey::from_public_key(ephemeral, &self.public_key, &self.shared_info1);
        let iv = Zeroizing::new(envelope_key.derive_iv_for_nonce(nonce)?);
        let (body, mac) = seal(&envelope_key, &self.shared_info2, iv.as_slice(), plaintext)?;
        let cryptogram = Cryptogram {
            body,
            mac,
            ephemeral_public_key: Some(envelope_key.ephemeral_public_key().to_vec()),
            nonce: Some(nonce.to_vec()),
        };
        let pending = ResponseDecryptor {
            envelope_key,
            iv,
            shared_info2: self.shared_info2,
        };
        Ok((cryptogram, pending))
    }
}

/// Holds the key material of a sent request until its response arrives.
pub struct ResponseDecryptor {
    envelope_key: EnvelopeKey,
    iv: Zeroizing<[u8; KEY_LENGTH]>,
    shared_info2: Vec<u8>,
}

impl ResponseDecryptor {
    /// Verify the MAC and decrypt the response with the request's key and IV.
    pub fn decrypt_response(self, cryptogram: &Cryptogram) -> CryptoResult<Vec<u8>> {
        open(&self.envelope_key, &self.shared_info2, self.iv.as_slice(), cryptogram)
    }

    pub fn envelope_key(&self) -> &EnvelopeKey {
        &self.envelope_key
    }
}

impl fmt::Debug for ResponseDecryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseDecryptor")
            .field("envelope_key", &self.envelope_key)
            .finish_non_exhaustive()
    }
}

/// Server-side decryptor holding the recipient's private key.
#[derive(Debug, Clone)]
pub struct Decryptor {
    key_pair: KeyPair,
    shared_info1: Vec<u8>,
    shared_info2: Vec<u8>,
}

impl Decryptor {
    pub fn new(private_key: &[u8], shared_info1: &[u8], shared_info2: &[u8]) -> CryptoResult<Self> {
        Ok(Self::from_key_pair(KeyPair::import(private_key)?, shared_info1, shared_info2))
    }

    pub fn from_key_pair(key_pair: KeyPair, shared_info1: &[u8], shared_info2: &[u8]) -> Self {
        Self {
            key_pair,
            shared_info1: shared_info1.to_vec(),
            shared_info2: shared_info2.to_vec(),
        }
    }

    /// Re-derive the envelope key from the request's ephemeral key and nonce,
    /// verify the MAC and decrypt.
    pub fn decrypt_request(
        self,
        cryptogram: &Cryptogram,
    ) -> CryptoResult<(Vec<u8>, ResponseEncryptor)> {
        let ephemeral = cryptogram
            .ephemeral_public_key
            .as_deref()
            .ok_or_else(|| {
                CryptoError::Format("missing ephemeral public key in cryptogram".into())
            })?;
        let nonce = cryptogram
            .nonce
            .as_deref()
            .ok_or_else(|| CryptoError::Format("missing nonce in cryptogram".into()))?;

        let envelope_key =
            EnvelopeKey::from_private_key(&self.key_pair, ephemeral, &self.shared_info1)?;
        let iv = Zeroizing::new(envelope_key.derive_iv_for_nonce(nonce)?);
        let plaintext = open(&envelope_key, &self.shared_info2, iv.as_slice(), cryptogram)?;
        let responder = ResponseEncryptor {
            envelope_key,
            iv,
            shared_info2: self.shared_info2,
        };
        Ok((plaintext, responder))
    }
}

/// Holds the key material of a received request until the response is sent.
pub struct ResponseEncryptor {
    envelope_key: EnvelopeKey,
    iv: Zeroizing<[u8; KEY_LENGTH]>,
    shared_info2: Vec<u8>,
}

impl ResponseEncryptor {
    /// Encrypt the response. The result carries neither key nor nonce.
    pub fn encrypt_response(self, plaintext: &[u8]) -> CryptoResult<Cryptogram> {
        let (body, mac) = seal(
            &self.envelope_key,
            &self.shared_info2,
            self.iv.as_slice(),
            plaintext,
        )?;
        Ok(Cryptogram { body, mac, ephemeral_public_key: None, nonce: None })
    }

    pub fn envelope_key(&self) -> &EnvelopeKey {
        &self.envelope_key
    }
}

impl fmt::Debug for ResponseEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseEncryptor")
            .field("envelope_key", &self.envelope_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256;
    use base64::{engine::general_purpose::STANDARD as B64, Engine as _};

    const SERVER_PRIVATE: &str = "1f1e1d1c1b1a191817161514131211100f0e0d0c0b0a09080706050403020100";
    const EPHEMERAL_PRIVATE: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    fn server() -> KeyPair {
        KeyPair::import(&hex::decode(SERVER_PRIVATE).unwrap()).unwrap()
    }

    fn info2() -> [u8; 32] {
        sha256(b"app-secret")
    }

    fn fixed_request() -> (Cryptogram, ResponseDecryptor) {
        let ephemeral = KeyPair::import(&hex::decode(EPHEMERAL_PRIVATE).unwrap()).unwrap();
        let mut nonce = [0u8; NONCE_LENGTH];
        for (i, b) in nonce.iter_mut().enumerate() {
            *b = 0xa0 + i as u8;
        }
        Encryptor::new(&server().public_key(true), b"/pa/activation", &info2())
            .unwrap()
            .encrypt_request_with(&ephemeral, &nonce, br#"{"hello":"world"}"#)
            .unwrap()
    }

    #[test]
    fn test_request_vector() {
        let (cryptogram, pending) = fixed_request();
        assert_eq!(B64.encode(&cryptogram.body), "7oz85kI9j3bY9GF6XLUfN8KNdzeRNGI4wkyV9g31Yms=");
        assert_eq!(B64.encode(&cryptogram.mac), "m7+mB62C7i64jFF6m8VGK6B6NB7wXMw26iQeeL6IEWE=");
        assert_eq!(
            B64.encode(cryptogram.ephemeral_public_key.as_ref().unwrap()),
            "Am/wO5SSQc4drdQ1GeaWDgqFtBppoFwygQOqK84VlMoW"
        );
        assert_eq!(B64.encode(cryptogram.nonce.as_ref().unwrap()), "oKGio6SlpqeoqaqrrK2urw==");

        let key = pending.envelope_key();
        assert_eq!(hex::encode(key.enc_key()), "aa5e3c629df04552b765dbd7db3bfd2d");
        assert_eq!(hex::encode(key.mac_key()), "724eef3335e1819c7c60a240974d075b");
        assert_eq!(hex::encode(key.iv_key()), "d6058224d0fd3f2fef02e20711091795");
    }

    #[test]
    fn test_response_vector() {
        let (request, pending) = fixed_request();
        let decryptor = Decryptor::from_key_pair(server(), b"/pa/activation", &info2());
        let (plaintext, responder) = decryptor.decrypt_request(&request).unwrap();
        assert_eq!(plaintext, br#"{"hello":"world"}"#);

        let response = responder.encrypt_response(br#"{"status":"ok"}"#).unwrap();
        assert_eq!(B64.encode(&response.body), "2d/sx5rMoGHcTjNSpUez9Q==");
        assert_eq!(B64.encode(&response.mac), "TwLp0y0/krQW/33fsZphYREBW1a3PpjxSusY4rqEiGk=");
        assert!(response.ephemeral_public_key.is_none());
        assert!(response.nonce.is_none());

        assert_eq!(pending.decrypt_response(&response).unwrap(), br#"{"status":"ok"}"#);
    }

    #[test]
    fn test_round_trip_with_random_keys() {
        let server = KeyPair::generate();
        let encryptor =
            Encryptor::new(&server.public_key(false), b"/shared/secret1", b"/shared/secret2")
                .unwrap();
        let decryptor =
            Decryptor::new(&server.private_key(), b"/shared/secret1", b"/shared/secret2").unwrap();

        let (request, pending) = encryptor.encrypt_request(b"request").unwrap();
        let (plaintext, responder) = decryptor.decrypt_request(&request).unwrap();
        assert_eq!(plaintext, b"request");

        let response = responder.encrypt_response(b"response").unwrap();
        assert_eq!(pending.decrypt_response(&response).unwrap(), b"response");
    }

    #[test]
    fn test_empty_plaintext() {
        let server = KeyPair::generate();
        let encryptor = Encryptor::new(&server.public_key(true), b"", b"").unwrap();
        let (request, _) = encryptor.encrypt_request(b"").unwrap();
        assert_eq!(request.body.len(), 16);
        let (plaintext, _) = Decryptor::from_key_pair(server, b"", b"")
            .decrypt_request(&request)
            .unwrap();
        assert!(plaintext.is_empty());
    }

    #[test]
    fn test_wrong_shared_info2_fails_authentication() {
        let server = KeyPair::generate();
        let encryptor =
            Encryptor::new(&server.public_key(true), b"/pa/token/create", b"channel-a").unwrap();
        let (request, _) = encryptor.encrypt_request(b"data").unwrap();
        let decryptor = Decryptor::from_key_pair(server, b"/pa/token/create", b"channel-b");
        assert!(matches!(decryptor.decrypt_request(&request), Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_wrong_shared_info1_fails_authentication() {
        let server = KeyPair::generate();
        let encryptor =
            Encryptor::new(&server.public_key(true), b"/pa/activation", b"info2").unwrap();
        let (request, _) = encryptor.encrypt_request(b"data").unwrap();
        let decryptor = Decryptor::from_key_pair(server, b"/pa/upgrade", b"info2");
        assert!(matches!(decryptor.decrypt_request(&request), Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_tampered_response_fails() {
        let (request, pending) = fixed_request();
        let decryptor = Decryptor::from_key_pair(server(), b"/pa/activation", &info2());
        let (_, responder) = decryptor.decrypt_request(&request).unwrap();
        let mut response = responder.encrypt_response(b"response").unwrap();
        response.mac[31] ^= 0x80;
        assert!(matches!(pending.decrypt_response(&response), Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_truncated_mac_fails() {
        let (mut request, _) = fixed_request();
        request.mac.truncate(16);
        let decryptor = Decryptor::from_key_pair(server(), b"/pa/activation", &info2());
        assert!(matches!(decryptor.decrypt_request(&request), Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_request_without_key_or_nonce_is_format_error() {
        let (request, _) = fixed_request();

        let mut no_key = request.clone();
        no_key.ephemeral_public_key = None;
        let decryptor = Decryptor::from_key_pair(server(), b"/pa/activation", &info2());
        assert!(matches!(decryptor.decrypt_request(&no_key), Err(CryptoError::Format(_))));

        let mut no_nonce = request;
        no_nonce.nonce = None;
        let decryptor = Decryptor::from_key_pair(server(), b"/pa/activation", &info2());
        assert!(matches!(decryptor.decrypt_request(&no_nonce), Err(CryptoError::Format(_))));
    }

    #[test]
    fn test_invalid_server_key_rejected() {
        assert!(matches!(Encryptor::new(&[0x00], b"", b""), Err(CryptoError::InvalidKey(_))));
        assert!(matches!(Encryptor::new(&[0x04; 10], b"", b""), Err(CryptoError::InvalidKey(_))));
    }
}
