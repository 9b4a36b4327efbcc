//! The unit the rules judge: kind(s), inputs, outputs, and a claimed signer set.
//!
//! A `Transition` is built by the initiator and shipped verbatim to every
//! counterparty. Its [`TransitionHash`] is computed from a canonical,
//! domain-tagged byte layout so that every party derives the same value
//! without agreeing on a serialization format.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{PartyId, TitleId, TitleState, TransitionHash, TransitionKind, constants};

/// A proposed or committed transition.
///
/// `kinds` is a list so that a malformed transition carrying zero or
/// several kinds can still be represented, and rejected, by the rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Transition kinds. Valid transitions carry exactly one.
    pub kinds: Vec<TransitionKind>,
    /// States consumed, in order.
    pub inputs: Vec<TitleState>,
    /// Ledger position of each input, parallel to `inputs`.
    #[serde(default)]
    pub input_refs: Vec<StateRef>,
    /// States produced, in order.
    pub outputs: Vec<TitleState>,
    /// The identities claimed to be required signers.
    pub signers: BTreeSet<PartyId>,
}

impl Transition {
    /// Single-kind transition.
    #[must_use]
    pub fn new(
        kind: TransitionKind,
        inputs: Vec<TitleState>,
        outputs: Vec<TitleState>,
        signers: BTreeSet<PartyId>,
    ) -> Self {
        Self {
            kinds: vec![kind],
            inputs,
            input_refs: Vec::new(),
            outputs,
            signers,
        }
    }

    /// Single-kind transition consuming the given live states.
    #[must_use]
    pub fn consuming(
        kind: TransitionKind,
        inputs: Vec<LiveTitle>,
        outputs: Vec<TitleState>,
        signers: BTreeSet<PartyId>,
    ) -> Self {
        let (input_refs, inputs) = inputs.into_iter().map(|live| (live.at, live.state)).unzip();
        Self {
            kinds: vec![kind],
            inputs,
            input_refs,
            outputs,
            signers,
        }
    }

    /// Inputs paired with their refs. `None` unless every input has one.
    #[must_use]
    pub fn referenced_inputs(&self) -> Option<Vec<(StateRef, &TitleState)>> {
        (self.input_refs.len() == self.inputs.len())
            .then(|| self.input_refs.iter().copied().zip(&self.inputs).collect())
    }

    /// The single kind, or `None` if there are zero or several.
    #[must_use]
    pub fn single_kind(&self) -> Option<TransitionKind> {
        match self.kinds.as_slice() {
            [kind] => Some(*kind),
            _ => None,
        }
    }

    /// The title this transition is about: the first output's id, falling
    /// back to the first input's.
    #[must_use]
    pub fn title_id(&self) -> Option<TitleId> {
        self.outputs
            .first()
            .or_else(|| self.inputs.first())
            .map(|s| s.id)
    }

    /// Union of the participants of every input and output state.
    #[must_use]
    pub fn participants(&self) -> BTreeSet<PartyId> {
        self.inputs
            .iter()
            .chain(&self.outputs)
            .flat_map(TitleState::participants)
            .collect()
    }

    /// Canonical signing payload.
    ///
    /// Format: `"rems:transition:v1:" || n_kinds || kind tags || n_inputs ||
    /// inputs || n_refs || (tx || index) per ref || n_outputs || outputs ||
    /// n_signers || signers (sorted)`. Counts and indices are u64
    /// little-endian.
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(256);
        payload.extend_from_slice(constants::TRANSITION_DOMAIN_TAG);
        payload.extend_from_slice(&(self.kinds.len() as u64).to_le_bytes());
        payload.extend(self.kinds.iter().map(|k| k.tag()));
        payload.extend_from_slice(&(self.inputs.len() as u64).to_le_bytes());
        for state in &self.inputs {
            payload.extend_from_slice(&state.canonical_bytes());
        }
        payload.extend_from_slice(&(self.input_refs.len() as u64).to_le_bytes());
        for at in &self.input_refs {
            payload.extend_from_slice(at.tx.as_bytes());
            payload.extend_from_slice(&(at.index as u64).to_le_bytes());
        }
        payload.extend_from_slice(&(self.outputs.len() as u64).to_le_bytes());
        for state in &self.outputs {
            payload.extend_from_slice(&state.canonical_bytes());
        }
        payload.extend_from_slice(&(self.signers.len() as u64).to_le_bytes());
        // BTreeSet iterates in sorted order.
        for signer in &self.signers {
            payload.extend_from_slice(signer.as_bytes());
        }
        payload
    }

    /// SHA-256 over [`Self::signing_payload`].
    #[must_use]
    pub fn hash(&self) -> TransitionHash {
        let digest = Sha256::digest(self.signing_payload());
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        TransitionHash(out)
    }

    /// Refs of the states this transition produces, paired with the states.
    pub fn output_refs(&self) -> impl Iterator<Item = (StateRef, &TitleState)> {
        let tx = self.hash();
        self.outputs
            .iter()
            .enumerate()
            .map(move |(index, state)| (StateRef { tx, index }, state))
    }
}

/// Where a state sits in the ledger: the transition that produced it and
/// its position among that transition's outputs.
///
/// Content alone does not identify a state: selling a title and buying it
/// back yields a state equal to the original, under a different ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct StateRef {
    pub tx: TransitionHash,
    pub index: usize,
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx, self.index)
    }
}

/// An unconsumed state together with its ledger position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveTitle {
    pub at: StateRef,
    pub state: TitleState,
}
