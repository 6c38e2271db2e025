//! Protocol key derivation.
//!
//! After activation both the device and the server hold the same reduced
//! master secret. Five fixed-purpose keys are derived from it with the AES
//! index KDF; the server checks signatures with its own copies, so these
//! derivations must stay bit-exact.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::ec::KeyPair;
use crate::error::CryptoResult;
use crate::kdf::{aes_kdf, reduce_shared_secret, KEY_LENGTH};

/// Protocol constants selecting each derived key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum KeyIndex {
    /// Possession factor signature key
    Possession = 1,
    /// Knowledge factor signature key
    Knowledge = 2,
    /// Biometry factor signature key
    Biometry = 3,
    /// Transport key (activation-scope ECIES, status blob)
    Transport = 1000,
    /// Vault encryption key
    Vault = 2000,
}

impl KeyIndex {
    pub const ALL: [KeyIndex; 5] = [
        KeyIndex::Possession,
        KeyIndex::Knowledge,
        KeyIndex::Biometry,
        KeyIndex::Transport,
        KeyIndex::Vault,
    ];

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// The five keys derived from a master secret.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SignatureKeys {
    pub possession_key: [u8; KEY_LENGTH],
    pub knowledge_key: [u8; KEY_LENGTH],
    pub biometry_key: [u8; KEY_LENGTH],
    pub transport_key: [u8; KEY_LENGTH],
    pub vault_key: [u8; KEY_LENGTH],
}

impl SignatureKeys {
    pub fn key(&self, index: KeyIndex) -> &[u8; KEY_LENGTH] {
        match index {
            KeyIndex::Possession => &self.possession_key,
            KeyIndex::Knowledge => &self.knowledge_key,
            KeyIndex::Biometry => &self.biometry_key,
            KeyIndex::Transport => &self.transport_key,
            KeyIndex::Vault => &self.vault_key,
        }
    }
}

impl fmt::Debug for SignatureKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SignatureKeys { .. }")
    }
}

/// Derive all signature keys from a 16-byte master secret.
pub fn derive_all_secret_keys(master_secret: &[u8]) -> CryptoResult<SignatureKeys> {
    Ok(SignatureKeys {
        possession_key: aes_kdf(master_secret, KeyIndex::Possession.as_u32())?,
        knowledge_key: aes_kdf(master_secret, KeyIndex::Knowledge.as_u32())?,
        biometry_key: aes_kdf(master_secret, KeyIndex::Biometry.as_u32())?,
        transport_key: aes_kdf(master_secret, KeyIndex::Transport.as_u32())?,
        vault_key: aes_kdf(master_secret, KeyIndex::Vault.as_u32())?,
    })
}

/// Master secret of an activation: `reduce(ECDH(own, peer))`.
///
/// The device calls it with its own key pair and the server public key, the
/// server with the reverse; both end up with the same 16 bytes.
pub fn derive_master_secret(
    own: &KeyPair,
    peer_public_key: &[u8],
) -> CryptoResult<[u8; KEY_LENGTH]> {
    let shared = own.shared_secret(peer_public_key)?;
    reduce_shared_secret(shared.as_slice())
}
