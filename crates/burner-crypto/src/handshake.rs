//! Ephemeral P-256 key agreement.
//!
//! Each session generates a fresh keypair, announces the public half as a
//! JWK, and derives the shared AES-256-GCM key once the peer's public key
//! arrives. Nothing secret ever leaves this module: the derived key is
//! computed independently on both sides.
//!
//! All functions are pure. Randomness is supplied by the caller so the
//! session layer can run against a seeded environment in tests.

use std::fmt;

use p256::{PublicKey, SecretKey, ecdh::diffie_hellman, elliptic_curve::JwkEcKey};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Size of a P-256 scalar in bytes.
const SCALAR_SIZE: usize = 32;

/// Size of the derived symmetric key (AES-256).
pub const SHARED_SECRET_SIZE: usize = 32;

/// Candidate scalars tried before giving up on key generation.
///
/// A uniformly random 32-byte string is out of range with probability
/// about 2^-32, so exhausting this bound means the randomness source is
/// broken.
const MAX_KEYGEN_ATTEMPTS: u32 = 16;

/// Ephemeral P-256 keypair owned by one session.
///
/// The secret scalar is zeroized when the keypair is dropped.
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a keypair from caller-supplied random bytes.
    ///
    /// `fill` must write cryptographically secure random bytes in
    /// production. Out-of-range candidates are rejected and resampled.
    ///
    /// # Errors
    ///
    /// - `KeyGeneration`: every candidate scalar was zero or above the group
    ///   order
    pub fn generate(mut fill: impl FnMut(&mut [u8])) -> Result<Self, CryptoError> {
        let mut candidate = [0u8; SCALAR_SIZE];

        for _ in 0..MAX_KEYGEN_ATTEMPTS {
            fill(&mut candidate);
            let parsed = SecretKey::from_slice(&candidate);
            candidate.zeroize();

            if let Ok(secret) = parsed {
                let public = secret.public_key();
                return Ok(Self { secret, public });
            }
        }

        Err(CryptoError::KeyGeneration { attempts: MAX_KEYGEN_ATTEMPTS })
    }

    /// Public half in its portable (wire) form.
    pub fn export_public(&self) -> PortableKey {
        PortableKey { key: self.public }
    }

    /// Derive the shared session key with the peer's public key.
    ///
    /// The AES-256 key is the 32-byte x-coordinate of the shared point, as
    /// WebCrypto `deriveKey` produces for `ECDH` into `AES-GCM` (256), so
    /// browser peers derive the same key.
    ///
    /// Deterministic: `a.derive(&b.export_public())` equals
    /// `b.derive(&a.export_public())`.
    pub fn derive(&self, peer: &PortableKey) -> SharedSecret {
        let shared = diffie_hellman(self.secret.to_nonzero_scalar(), peer.key.as_affine());

        let mut key = [0u8; SHARED_SECRET_SIZE];
        key.copy_from_slice(shared.raw_secret_bytes().as_slice());

        SharedSecret { key }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").field("public", &self.export_public()).finish_non_exhaustive()
    }
}

/// Validated public key in the form carried by `key` frames.
///
/// On the wire this is a JWK object (`kty`, `crv`, `x`, `y`), the same shape
/// browsers export, so peers on either side can import it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PortableKey {
    key: PublicKey,
}

impl PortableKey {
    /// Import a peer key from its JSON (JWK) representation.
    ///
    /// # Errors
    ///
    /// - `InvalidPublicKey`: not a JWK, wrong curve, or point not on P-256
    pub fn from_json(value: &serde_json::Value) -> Result<Self, CryptoError> {
        let jwk: JwkEcKey = serde_json::from_value(value.clone())
            .map_err(|e| CryptoError::InvalidPublicKey { reason: e.to_string() })?;

        let key = PublicKey::from_jwk(&jwk).map_err(|_| CryptoError::InvalidPublicKey {
            reason: format!("not a valid {} point", jwk.crv()),
        })?;

        Ok(Self { key })
    }

    /// JSON (JWK) representation for the wire.
    pub fn to_json(&self) -> serde_json::Value {
        let Ok(value) = serde_json::to_value(self.key.to_jwk()) else {
            unreachable!("JWK of a valid point always serializes");
        };
        value
    }

    /// SEC1 compressed encoding, useful for comparing keys in logs.
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        self.key.to_sec1_bytes().to_vec()
    }
}

impl fmt::Debug for PortableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_sec1_bytes();
        let prefix: String = bytes.iter().take(8).map(|b| format!("{b:02x}")).collect();
        write!(f, "PortableKey({prefix}..)")
    }
}

/// Symmetric session key derived from the handshake.
///
/// Zeroized on drop. `Debug` never prints key material.
pub struct SharedSecret {
    key: [u8; SHARED_SECRET_SIZE],
}

impl SharedSecret {
    /// Raw AES-256 key bytes.
    pub(crate) fn key(&self) -> &[u8; SHARED_SECRET_SIZE] {
        &self.key
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}
