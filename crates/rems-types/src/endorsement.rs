//! Endorsements and fully-endorsed transitions.
//!
//! An [`Endorsement`] is one party's ed25519 signature over a
//! [`TransitionHash`]. A [`SignedTransition`] is a transition plus the
//! endorsements collected for it; it is what the initiator submits to the
//! sequencer and what the sequencer commits.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use ed25519_dalek::Signature;
use serde::{Deserialize, Serialize};

use crate::{PartyId, RemsError, Result, Transition, TransitionHash};

/// One party's signature over a specific candidate transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endorsement {
    /// Who signed. Doubles as the verifying key.
    pub signer: PartyId,
    /// The transition the signature covers.
    pub transition_hash: TransitionHash,
    /// Ed25519 signature over `transition_hash`.
    pub signature: Vec<u8>,
}

impl Endorsement {
    /// Check the signature and that it covers `expected`.
    ///
    /// # Errors
    /// Returns [`RemsError::InvalidEndorsement`] on a hash mismatch, a
    /// malformed signature, or a failed verification.
    pub fn verify(&self, expected: &TransitionHash) -> Result<()> {
        if self.transition_hash != *expected {
            return Err(RemsError::InvalidEndorsement {
                party: self.signer,
                reason: format!(
                    "endorsement covers {}, expected {expected}",
                    self.transition_hash
                ),
            });
        }
        let signature =
            Signature::from_slice(&self.signature).map_err(|e| RemsError::InvalidEndorsement {
                party: self.signer,
                reason: format!("malformed signature: {e}"),
            })?;
        self.signer
            .verifying_key()?
            .verify_strict(self.transition_hash.as_bytes(), &signature)
            .map_err(|e| RemsError::InvalidEndorsement {
                party: self.signer,
                reason: format!("signature verification failed: {e}"),
            })
    }
}

/// A transition together with the endorsements collected for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransition {
    pub transition: Transition,
    pub endorsements: Vec<Endorsement>,
}

impl SignedTransition {
    #[must_use]
    pub fn new(transition: Transition, endorsements: Vec<Endorsement>) -> Self {
        Self {
            transition,
            endorsements,
        }
    }

    #[must_use]
    pub fn hash(&self) -> TransitionHash {
        self.transition.hash()
    }

    /// Identities that have endorsed, valid or not.
    #[must_use]
    pub fn endorsed_by(&self) -> BTreeSet<PartyId> {
        self.endorsements.iter().map(|e| e.signer).collect()
    }

    /// Claimed signers with no endorsement attached.
    #[must_use]
    pub fn missing_signers(&self) -> BTreeSet<PartyId> {
        let endorsed = self.endorsed_by();
        self.transition
            .signers
            .difference(&endorsed)
            .copied()
            .collect()
    }

    /// Every claimed signer endorsed exactly once, every endorsement is
    /// valid, and nobody outside the signer set endorsed.
    ///
    /// # Errors
    /// Returns [`RemsError::InvalidEndorsement`] naming the first offending
    /// party.
    pub fn verify_required_signatures(&self) -> Result<()> {
        let hash = self.hash();
        let mut seen = BTreeSet::new();
        for endorsement in &self.endorsements {
            if !self.transition.signers.contains(&endorsement.signer) {
                return Err(RemsError::InvalidEndorsement {
                    party: endorsement.signer,
                    reason: "not a required signer".to_string(),
                });
            }
            if !seen.insert(endorsement.signer) {
                return Err(RemsError::InvalidEndorsement {
                    party: endorsement.signer,
                    reason: "duplicate endorsement".to_string(),
                });
            }
            endorsement.verify(&hash)?;
        }
        if let Some(missing) = self.missing_signers().into_iter().next() {
            return Err(RemsError::InvalidEndorsement {
                party: missing,
                reason: "endorsement missing".to_string(),
            });
        }
        Ok(())
    }
}

/// A transition the sequencer has ordered and made final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedTransition {
    /// Position in the sequencer's total order, starting at 0.
    pub sequence: u64,
    pub signed: SignedTransition,
    pub committed_at: DateTime<Utc>,
}

impl CommittedTransition {
    #[must_use]
    pub fn transition(&self) -> &Transition {
        &self.signed.transition
    }
}
