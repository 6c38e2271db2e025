//! AES-128 block cipher helpers.
//!
//! CBC with PKCS#7 padding for payloads, and a raw single-block encryption
//! used by the index-based key derivation.

use aes::cipher::{
    block_padding::Pkcs7, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit,
};
use aes::{Aes128, Block};

use crate::error::{CryptoError, CryptoResult};

/// AES block and key size in bytes.
pub const AES_BLOCK_SIZE: usize = 16;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

fn check_key_iv(key: &[u8], iv: &[u8]) -> CryptoResult<()> {
    if key.len() != AES_BLOCK_SIZE {
        return Err(CryptoError::bad_length("AES key", AES_BLOCK_SIZE, key.len()));
    }
    if iv.len() != AES_BLOCK_SIZE {
        return Err(CryptoError::bad_length("IV", AES_BLOCK_SIZE, iv.len()));
    }
    Ok(())
}

/// AES-128-CBC encryption with PKCS#7 padding.
///
/// Block-aligned input still receives a full block of padding.
pub fn aes128_cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    check_key_iv(key, iv)?;
    let enc = Aes128CbcEnc::new_from_slices(key, iv)
        .map_err(|_| CryptoError::bad_length("AES key", AES_BLOCK_SIZE, key.len()))?;
    Ok(enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// AES-128-CBC decryption with PKCS#7 padding validation.
pub fn aes128_cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    check_key_iv(key, iv)?;
    if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_SIZE != 0 {
        return Err(CryptoError::Format(format!(
            "ciphertext length {} is not a positive multiple of {AES_BLOCK_SIZE}",
            ciphertext.len()
        )));
    }
    let dec = Aes128CbcDec::new_from_slices(key, iv)
        .map_err(|_| CryptoError::bad_length("AES key", AES_BLOCK_SIZE, key.len()))?;
    dec.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::Format("invalid PKCS#7 padding".into()))
}

/// Encrypts exactly one block with AES-128, no chaining and no padding.
pub fn aes128_encrypt_block(
    key: &[u8],
    block: &[u8; AES_BLOCK_SIZE],
) -> CryptoResult<[u8; AES_BLOCK_SIZE]> {
    if key.len() != AES_BLOCK_SIZE {
        return Err(CryptoError::bad_length("AES key", AES_BLOCK_SIZE, key.len()));
    }
    let cipher = Aes128::new_from_slice(key)
        .map_err(|_| CryptoError::bad_length("AES key", AES_BLOCK_SIZE, key.len()))?;
    let mut b = Block::clone_from_slice(block);
    cipher.encrypt_block(&mut b);
    let mut out = [0u8; AES_BLOCK_SIZE];
    out.copy_from_slice(&b);
    Ok(out)
}
