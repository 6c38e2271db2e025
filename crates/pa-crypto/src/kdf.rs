//! Key derivation functions used by the protocol.
//!
//! * ANSI X9.63 KDF with SHA-256 (ECIES envelope keys)
//! * AES-128 index KDF (per-purpose signature keys)
//! * 32 to 16 byte secret reduction and HMAC index derivation (ECIES IVs)

use bytes::{BufMut, BytesMut};
use sha2::{Digest, Sha256};

use crate::cipher::{aes128_encrypt_block, AES_BLOCK_SIZE};
use crate::error::{CryptoError, CryptoResult};
use crate::hash::{hmac_sha256_full, HASH_LENGTH};

/// Size of a reduced secret and of every derived symmetric key.
pub const KEY_LENGTH: usize = 16;

/// X9.63 KDF over SHA-256: `SHA256(secret || BE32(counter) || info)` for
/// counter = 1, 2, ... concatenated and truncated to `key_size`.
pub fn kdf_x963_sha256(secret: &[u8], info: &[u8], key_size: usize) -> Vec<u8> {
    let rounds = key_size.div_ceil(HASH_LENGTH);
    let mut out = BytesMut::with_capacity(rounds * HASH_LENGTH);
    let mut counter: u32 = 1;
    while out.len() < key_size {
        let mut h = Sha256::new();
        h.update(secret);
        h.update(counter.to_be_bytes());
        h.update(info);
        out.put_slice(&h.finalize());
        counter += 1;
    }
    out.truncate(key_size);
    out.to_vec()
}

/// AES-128 single-block encryption of `0^12 || BE32(index)` keyed by `secret`.
pub fn aes_kdf(secret: &[u8], index: u32) -> CryptoResult<[u8; KEY_LENGTH]> {
    if secret.len() != KEY_LENGTH {
        return Err(CryptoError::bad_length("KDF secret", KEY_LENGTH, secret.len()));
    }
    let mut block = [0u8; AES_BLOCK_SIZE];
    block[12..].copy_from_slice(&index.to_be_bytes());
    aes128_encrypt_block(secret, &block)
}

/// XOR of the first and the second half of a 32-byte secret.
pub fn reduce_shared_secret(secret: &[u8]) -> CryptoResult<[u8; KEY_LENGTH]> {
    if secret.len() != 2 * KEY_LENGTH {
        return Err(CryptoError::bad_length("secret to reduce", 2 * KEY_LENGTH, secret.len()));
    }
    let (lo, hi) = secret.split_at(KEY_LENGTH);
    let mut out = [0u8; KEY_LENGTH];
    for (o, (a, b)) in out.iter_mut().zip(lo.iter().zip(hi)) {
        *o = a ^ b;
    }
    Ok(out)
}

/// `reduce(HMAC-SHA256(master_secret, index))`. Turns a message nonce into a
/// deterministic 16-byte IV.
pub fn derive_secret_key_from_index(
    master_secret: &[u8],
    index: &[u8],
) -> CryptoResult<[u8; KEY_LENGTH]> {
    if master_secret.len() != KEY_LENGTH {
        return Err(CryptoError::bad_length("master secret", KEY_LENGTH, master_secret.len()));
    }
    let derived = hmac_sha256_full(master_secret, index)?;
    reduce_shared_secret(&derived)
}
