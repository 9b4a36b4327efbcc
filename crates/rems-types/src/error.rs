//! Error types for REMS.
//!
//! All errors use the `REMS_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Title / lookup errors
//! - 2xx: Transition validation errors
//! - 3xx: Endorsement / session errors
//! - 4xx: Sequencer errors
//! - 5xx: Protocol state errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{PartyId, Rejection, TitleId};

/// Central error enum for all REMS operations.
#[derive(Debug, Error)]
pub enum RemsError {
    // =================================================================
    // Title Errors (1xx)
    // =================================================================
    /// No unconsumed state exists for this title.
    #[error("REMS_ERR_100: Title not found: {0}")]
    TitleNotFound(TitleId),

    // =================================================================
    // Validation Errors (2xx)
    // =================================================================
    /// The transition broke a contract rule.
    #[error("REMS_ERR_200: Invalid transition: {0}")]
    InvalidTransition(Rejection),

    /// The initiator is not among the signers the transition requires.
    #[error("REMS_ERR_201: {0} is not a required signer of this transition")]
    NotARequiredSigner(PartyId),

    // =================================================================
    // Endorsement Errors (3xx)
    // =================================================================
    /// A counterparty validated the candidate and refused to endorse it.
    #[error("REMS_ERR_300: Counterparty {party} rejected the transition: {reason}")]
    CounterpartyRejected { party: PartyId, reason: String },

    /// An endorsement is malformed, forged, or covers another transition.
    #[error("REMS_ERR_301: Invalid endorsement from {party}: {reason}")]
    InvalidEndorsement { party: PartyId, reason: String },

    /// A counterparty did not answer in time.
    #[error("REMS_ERR_302: Endorsement timeout waiting for {0}")]
    EndorsementTimeout(PartyId),

    /// The session to a counterparty closed before it answered.
    #[error("REMS_ERR_303: Session with {0} closed")]
    SessionClosed(PartyId),

    /// No session can be opened to this party.
    #[error("REMS_ERR_304: Unknown counterparty: {0}")]
    UnknownCounterparty(PartyId),

    // =================================================================
    // Sequencer Errors (4xx)
    // =================================================================
    /// An input was already consumed by another committed transition.
    #[error("REMS_ERR_400: Conflict on {title}: {reason}")]
    Conflict { title: TitleId, reason: String },

    /// The sequencer's own validation refused the transition.
    #[error("REMS_ERR_401: Sequencer rejected the transition: {reason}")]
    SequencerRejected { reason: String },

    // =================================================================
    // Protocol Errors (5xx)
    // =================================================================
    /// A protocol state machine was asked to move somewhere it cannot go.
    #[error("REMS_ERR_500: Illegal phase change from {from} to {to}")]
    WrongPhase { from: String, to: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("REMS_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("REMS_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl RemsError {
    /// Whether the caller should re-fetch the title and propose again.
    ///
    /// Only sequencer conflicts qualify; everything else is either
    /// deterministic or needs a corrected candidate.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// The violated rule, if this is a validation failure.
    #[must_use]
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::InvalidTransition(r) => Some(*r),
            _ => None,
        }
    }
}

impl From<Rejection> for RemsError {
    fn from(rejection: Rejection) -> Self {
        Self::InvalidTransition(rejection)
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, RemsError>;
