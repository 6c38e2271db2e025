//! P-256 key pairs and ECDH key agreement.
//!
//! The curve is fixed to NIST P-256 (`prime256v1`), the one the server uses.

use std::fmt;

use p256::ecdh::diffie_hellman;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand_core::OsRng;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};

/// Length of an ECDH shared secret (x-coordinate) in bytes.
pub const SHARED_SECRET_LENGTH: usize = 32;
/// Length of a SEC1 compressed public key.
pub const COMPRESSED_PUBLIC_KEY_LENGTH: usize = 33;
/// Length of a SEC1 uncompressed public key.
pub const UNCOMPRESSED_PUBLIC_KEY_LENGTH: usize = 65;

/// A P-256 private scalar together with its public point.
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair from the OS random source.
    pub fn generate() -> Self {
        let secret = SecretKey::random(&mut OsRng);
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Import a private scalar (big-endian) and recompute its public point.
    ///
    /// Scalars shorter than 32 bytes are accepted as long as the curve
    /// implementation can left-pad them; zero and out-of-range scalars fail.
    pub fn import(private_key: &[u8]) -> CryptoResult<Self> {
        let secret = SecretKey::from_slice(private_key)
            .map_err(|_| CryptoError::InvalidKey("invalid P-256 private scalar".into()))?;
        let public = secret.public_key();
        Ok(Self { secret, public })
    }

    /// SEC1 encoding of the public key.
    pub fn public_key(&self, compressed: bool) -> Vec<u8> {
        self.public.to_encoded_point(compressed).as_bytes().to_vec()
    }

    /// Big-endian private scalar, wiped when the returned buffer drops.
    pub fn private_key(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.secret.to_bytes().to_vec())
    }

    /// ECDH with a peer's SEC1-encoded public key; returns the x-coordinate.
    pub fn shared_secret(
        &self,
        peer_public_key: &[u8],
    ) -> CryptoResult<Zeroizing<[u8; SHARED_SECRET_LENGTH]>> {
        let peer = parse_public_key(peer_public_key)?;
        Ok(shared_secret(self, &peer))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public_key(true))
            .finish_non_exhaustive()
    }
}

/// Parse a compressed or uncompressed SEC1 public key.
///
/// Points not on the curve and the identity element are rejected.
pub fn parse_public_key(bytes: &[u8]) -> CryptoResult<PublicKey> {
    PublicKey::from_sec1_bytes(bytes)
        .map_err(|_| CryptoError::InvalidKey("public key is not a valid P-256 point".into()))
}

/// x-coordinate of `own_private * peer_public`.
pub fn shared_secret(own: &KeyPair, peer: &PublicKey) -> Zeroizing<[u8; SHARED_SECRET_LENGTH]> {
    let shared = diffie_hellman(own.secret.to_nonzero_scalar(), peer.as_affine());
    let mut out = Zeroizing::new([0u8; SHARED_SECRET_LENGTH]);
    out.copy_from_slice(shared.raw_secret_bytes());
    out
}
