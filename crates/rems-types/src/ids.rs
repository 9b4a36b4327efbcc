//! Identifiers used throughout REMS.
//!
//! Titles use UUIDv7 so registrations sort by creation time. Parties are
//! identified directly by their ed25519 public key, so an identity can
//! verify its own endorsements without a key directory.

use std::fmt;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TitleId
// ---------------------------------------------------------------------------

/// Stable identifier of a title, assigned once at registration.
///
/// Successive [`TitleState`](crate::TitleState)s of the same title share
/// this id; nothing else links them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TitleId(pub Uuid);

impl TitleId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for TitleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "title:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PartyId
// ---------------------------------------------------------------------------

/// Identity of an owner, tenant, or any other signing party.
/// This is the raw ed25519 public key (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PartyId(pub [u8; 32]);

impl PartyId {
    #[must_use]
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(key.to_bytes())
    }

    /// Decode the ed25519 verifying key. Fails if the bytes are not a valid
    /// curve point.
    pub fn verifying_key(&self) -> crate::Result<VerifyingKey> {
        VerifyingKey::from_bytes(&self.0).map_err(|e| crate::RemsError::InvalidEndorsement {
            party: *self,
            reason: format!("not an ed25519 public key: {e}"),
        })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "party:{}", hex::encode(&self.0[..8]))
    }
}

/// Deterministic identities for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl PartyId {
    /// Public key derived from the signing seed `[seed; 32]`.
    pub fn from_seed(seed: u8) -> Self {
        let key = ed25519_dalek::SigningKey::from_bytes(&[seed; 32]);
        Self::from_verifying_key(&key.verifying_key())
    }
}

// ---------------------------------------------------------------------------
// TransitionHash
// ---------------------------------------------------------------------------

/// SHA-256 commitment to a transition's canonical signing payload.
///
/// This is what every endorsement signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TransitionHash(pub [u8; 32]);

impl TransitionHash {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TransitionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
