//! Messages exchanged between an initiator and its counterparties.
//!
//! The content is the candidate transition (four title fields per state
//! plus the kind) and its claimed signer set, never transport framing.

use async_trait::async_trait;
use rems_types::{Endorsement, PartyId, Rejection, Result, Transition};
use serde::{Deserialize, Serialize};

/// An endorsement request. `transition.signers` is the initiator's claimed
/// signer set; the responder recomputes it rather than trusting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub initiator: PartyId,
    pub transition: Transition,
}

/// A counterparty's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentReply {
    Endorsed(Endorsement),
    Rejected {
        party: PartyId,
        /// Human-readable reason, shown to the initiator verbatim.
        reason: String,
        /// The violated contract rule, when the refusal came from the rules.
        rule: Option<Rejection>,
    },
}

/// One open conversation with one counterparty.
#[async_trait]
pub trait Session: Send + Sync {
    fn counterparty(&self) -> PartyId;

    /// Send the request and wait for the reply. This is the only point
    /// where a proposal suspends.
    ///
    /// # Errors
    /// Transport failures only, e.g. [`RemsError::SessionClosed`]. A
    /// refusal is an `Ok(ConsentReply::Rejected { .. })`.
    ///
    /// [`RemsError::SessionClosed`]: rems_types::RemsError::SessionClosed
    async fn send(&self, request: ProposalRequest) -> Result<ConsentReply>;
}

/// Opens sessions to other parties.
pub trait Counterparties: Send + Sync {
    /// # Errors
    /// [`RemsError::UnknownCounterparty`] if `party` cannot be reached.
    ///
    /// [`RemsError::UnknownCounterparty`]: rems_types::RemsError::UnknownCounterparty
    fn open_session(&self, party: PartyId) -> Result<Box<dyn Session>>;
}
