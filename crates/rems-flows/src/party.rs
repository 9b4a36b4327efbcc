//! A signing identity able to endorse transitions.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey};
use rems_types::{Endorsement, PartyId, Transition};

/// One party: an ed25519 signing key and the [`PartyId`] derived from it.
pub struct Party {
    signing_key: SigningKey,
    id: PartyId,
}

impl Party {
    /// Fresh identity from the OS random number generator.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Identity from a fixed 32-byte secret seed.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(&seed))
    }

    #[must_use]
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let id = PartyId::from_verifying_key(&signing_key.verifying_key());
        Self { signing_key, id }
    }

    #[must_use]
    pub fn id(&self) -> PartyId {
        self.id
    }

    /// Sign the transition's hash.
    #[must_use]
    pub fn endorse(&self, transition: &Transition) -> Endorsement {
        let transition_hash = transition.hash();
        let signature = self.signing_key.sign(transition_hash.as_bytes());
        Endorsement {
            signer: self.id,
            transition_hash,
            signature: signature.to_bytes().to_vec(),
        }
    }
}

impl fmt::Debug for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Party").field("id", &self.id).finish_non_exhaustive()
    }
}
