use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{CryptoError, CryptoResult};

/// Output size of SHA-256 and HMAC-SHA256.
pub const HASH_LENGTH: usize = 32;

type HmacSha256 = Hmac<Sha256>;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(data);
    let out = h.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    arr
}

/// HMAC-SHA256 truncated to `mac_length` bytes.
///
/// The MAC is always computed in full; truncation only drops trailing bytes.
pub fn hmac_sha256(key: &[u8], data: &[u8], mac_length: usize) -> CryptoResult<Vec<u8>> {
    if mac_length > HASH_LENGTH {
        return Err(CryptoError::Configuration(format!(
            "MAC length {mac_length} exceeds {HASH_LENGTH}"
        )));
    }
    let mut out = hmac_sha256_full(key, data)?.to_vec();
    out.truncate(mac_length);
    Ok(out)
}

/// Full-length HMAC-SHA256.
pub fn hmac_sha256_full(key: &[u8], data: &[u8]) -> CryptoResult<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|_| CryptoError::Configuration("invalid HMAC key".into()))?;
    mac.update(data);
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&mac.finalize().into_bytes());
    Ok(arr)
}
