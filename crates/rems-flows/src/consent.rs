//! Consent protocol, run by each counterparty asked to endorse.
//!
//! ## State Machine
//!
//! ```text
//!   ┌───────────┐     ┌────────────┐  valid    ┌───────────┐
//!   │ RECEIVING ├────▶│ VALIDATING ├──────────▶│ ENDORSING │
//!   └───────────┘     └─────┬──────┘           └───────────┘
//!                           │ any check fails
//!                           ▼
//!                     ┌───────────┐
//!                     │ REJECTING │
//!                     └───────────┘
//! ```
//!
//! The responder trusts nothing the initiator says about the transition:
//! it recomputes the signer set from the states, runs the contract rules
//! itself, and only then applies its own policy. None of this depends on
//! who the initiator is.

use std::{fmt, sync::Arc};

use rems_contract::rules;
use rems_types::{Rejection, Transition, TransitionKind};

use crate::party::Party;
use crate::session::{ConsentReply, ProposalRequest};

/// Phase of one consent session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsentPhase {
    Receiving,
    Validating,
    Endorsing,
    Rejecting,
}

impl fmt::Display for ConsentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Receiving => write!(f, "RECEIVING"),
            Self::Validating => write!(f, "VALIDATING"),
            Self::Endorsing => write!(f, "ENDORSING"),
            Self::Rejecting => write!(f, "REJECTING"),
        }
    }
}

/// Extra acceptance checks a responder applies after the contract rules.
///
/// A policy can only refuse what the rules accept, never accept what
/// they refuse.
pub trait ConsentPolicy: Send + Sync {
    /// # Errors
    /// The reason for declining, shown to the initiator.
    fn check(&self, kind: TransitionKind, transition: &Transition) -> Result<(), String>;
}

/// Endorses everything the contract rules accept.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ConsentPolicy for AcceptAll {
    fn check(&self, _kind: TransitionKind, _transition: &Transition) -> Result<(), String> {
        Ok(())
    }
}

/// Declines every transition of the listed kinds.
#[derive(Debug, Clone, Default)]
pub struct DeclineKinds(pub Vec<TransitionKind>);

impl ConsentPolicy for DeclineKinds {
    fn check(&self, kind: TransitionKind, _transition: &Transition) -> Result<(), String> {
        if self.0.contains(&kind) {
            Err(format!("{kind} transitions are declined by this party"))
        } else {
            Ok(())
        }
    }
}

/// One responder-side session.
pub struct ConsentProtocol {
    party: Arc<Party>,
    policy: Arc<dyn ConsentPolicy>,
    phase: ConsentPhase,
}

impl ConsentProtocol {
    #[must_use]
    pub fn new(party: Arc<Party>) -> Self {
        Self::with_policy(party, Arc::new(AcceptAll))
    }

    #[must_use]
    pub fn with_policy(party: Arc<Party>, policy: Arc<dyn ConsentPolicy>) -> Self {
        Self {
            party,
            policy,
            phase: ConsentPhase::Receiving,
        }
    }

    #[must_use]
    pub fn phase(&self) -> ConsentPhase {
        self.phase
    }

    /// Validate the request independently and endorse or reject it.
    pub fn respond(&mut self, request: &ProposalRequest) -> ConsentReply {
        self.phase = ConsentPhase::Validating;
        let transition = &request.transition;
        tracing::debug!(
            party = %self.party.id(),
            initiator = %request.initiator,
            tx = %transition.hash(),
            "validating proposal"
        );

        match self.validate(transition) {
            Ok(()) => {
                self.phase = ConsentPhase::Endorsing;
                let endorsement = self.party.endorse(transition);
                tracing::info!(
                    party = %self.party.id(),
                    tx = %endorsement.transition_hash,
                    "endorsed transition"
                );
                ConsentReply::Endorsed(endorsement)
            }
            Err((reason, rule)) => {
                self.phase = ConsentPhase::Rejecting;
                tracing::warn!(
                    party = %self.party.id(),
                    initiator = %request.initiator,
                    %reason,
                    "rejected transition"
                );
                ConsentReply::Rejected {
                    party: self.party.id(),
                    reason,
                    rule,
                }
            }
        }
    }

    fn validate(&self, transition: &Transition) -> Result<(), (String, Option<Rejection>)> {
        let Some(kind) = transition.single_kind() else {
            let rule = Rejection::AmbiguousKind {
                found: transition.kinds.len(),
            };
            return Err((rule.to_string(), Some(rule)));
        };

        let required = rules::required_signers(kind, &transition.inputs, &transition.outputs);
        if required != transition.signers {
            return Err((
                "Claimed signer set does not match the signers the transition requires"
                    .to_string(),
                None,
            ));
        }
        if !required.contains(&self.party.id()) {
            return Err((
                format!("{} is not a participant of this transition", self.party.id()),
                None,
            ));
        }

        rules::verify(transition).map_err(|rule| (rule.to_string(), Some(rule)))?;

        self.policy
            .check(kind, transition)
            .map_err(|reason| (reason, None))
    }
}
