//! Key exchange state machine.
//!
//! ```text
//! NoKey ──generate──► KeyGenerated ──announce──► AwaitingPeerKey
//!                                                     │ valid peer key
//!                                                     ▼
//!                                                Established
//! ```
//!
//! The first valid peer key derives the shared secret and asks the caller to
//! re-announce our key once, which covers a peer that joined after our first
//! announcement was sent. Later key frames are no-ops: the secret is never
//! replaced and there is no further re-announcement, so two peers cannot
//! ping-pong key frames.

use burner_crypto::{CryptoError, KeyPair, PortableKey, SharedSecret};
use serde_json::Value;

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// No keypair (before generation, or after teardown)
    NoKey,
    /// Keypair generated, not yet announced
    KeyGenerated,
    /// Our key is announced, waiting for the peer's
    AwaitingPeerKey,
    /// Shared secret derived
    Established,
}

/// Result of feeding a peer key into the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerKeyOutcome {
    /// Secret derived just now; re-announce this key to the peer once.
    Established {
        /// Our public key
        own_key: PortableKey,
    },
    /// Already established or no keypair; nothing to do.
    Ignored,
}

/// Ephemeral keypair plus the derived secret.
#[derive(Debug)]
pub struct Handshake {
    state: HandshakeState,
    keypair: Option<KeyPair>,
    secret: Option<SharedSecret>,
}

impl Handshake {
    /// Handshake with no keypair.
    pub fn new() -> Self {
        Self { state: HandshakeState::NoKey, keypair: None, secret: None }
    }

    /// Generate the ephemeral keypair.
    ///
    /// # Errors
    ///
    /// - `KeyGeneration` if the randomness never yields a valid scalar
    pub fn generate(&mut self, fill: impl FnMut(&mut [u8])) -> Result<(), CryptoError> {
        self.keypair = Some(KeyPair::generate(fill)?);
        self.secret = None;
        self.state = HandshakeState::KeyGenerated;
        Ok(())
    }

    /// Our public key for the initial announcement.
    ///
    /// Moves `KeyGenerated` to `AwaitingPeerKey`. Returns `None` without a
    /// keypair.
    pub fn announce(&mut self) -> Option<PortableKey> {
        let own_key = self.keypair.as_ref()?.export_public();

        if self.state == HandshakeState::KeyGenerated {
            self.state = HandshakeState::AwaitingPeerKey;
        }

        Some(own_key)
    }

    /// Feed a peer key received in a `key` frame.
    ///
    /// # Errors
    ///
    /// - `InvalidPublicKey` if the key is malformed; the state is unchanged
    ///   and a later valid key is still accepted
    pub fn receive_peer_key(&mut self, jwk: &Value) -> Result<PeerKeyOutcome, CryptoError> {
        let Some(keypair) = self.keypair.as_ref() else {
            return Ok(PeerKeyOutcome::Ignored);
        };

        if self.state == HandshakeState::Established {
            return Ok(PeerKeyOutcome::Ignored);
        }

        let peer = PortableKey::from_json(jwk)?;
        let own_key = keypair.export_public();

        self.secret = Some(keypair.derive(&peer));
        self.state = HandshakeState::Established;

        Ok(PeerKeyOutcome::Established { own_key })
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// True once the shared secret exists.
    pub fn is_established(&self) -> bool {
        self.state == HandshakeState::Established
    }

    /// Shared secret, if established.
    pub fn secret(&self) -> Option<&SharedSecret> {
        self.secret.as_ref()
    }

    /// Drop the keypair and secret (zeroized on drop).
    pub fn clear(&mut self) {
        self.keypair = None;
        self.secret = None;
        self.state = HandshakeState::NoKey;
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}
