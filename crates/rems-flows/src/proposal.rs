//! Proposal protocol, run by the party initiating a transition.
//!
//! ## State Machine
//!
//! ```text
//!   BUILDING → LOCAL_VALIDATION → AWAITING_ENDORSEMENTS → SUBMITTING → FINALIZED
//!       │              │                    │                  │
//!       └──────────────┴────────────────────┴──────────────────┴──▶ FAILED(reason)
//! ```
//!
//! - **BUILDING**: resolve the input and its ledger ref through [`Lookup`], build the output.
//! - **LOCAL_VALIDATION**: derive the signer set, run the contract rules.
//!   Nothing leaves this party if the candidate cannot be valid.
//! - **AWAITING_ENDORSEMENTS**: one session per required signer other than
//!   ourselves, all outstanding at once. The first rejection, timeout, or
//!   bad endorsement abandons the rest.
//! - **SUBMITTING**: add our own endorsement and hand the transition to the
//!   [`Sequencer`]. A conflict is reported, never retried here.

use std::{fmt, sync::Arc};

use futures::future::try_join_all;
use rems_contract::rules;
use rems_types::{
    Command, CommittedTransition, Endorsement, LiveTitle, PartyId, ProtocolConfig, RemsError,
    Result, SignedTransition, TitleState, Transition, TransitionHash,
};

use crate::party::Party;
use crate::services::{Lookup, Sequencer, SubmitOutcome};
use crate::session::{ConsentReply, Counterparties, ProposalRequest};

/// Phase of one proposal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProposalPhase {
    Building,
    LocalValidation,
    AwaitingEndorsements,
    Submitting,
    Finalized,
    Failed(String),
}

impl ProposalPhase {
    /// Can the proposal move from this phase to `target`?
    ///
    /// Forward moves are one step at a time; `Failed` is reachable from
    /// every non-terminal phase.
    #[must_use]
    pub fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (Self::Building, Self::LocalValidation)
                | (Self::LocalValidation, Self::AwaitingEndorsements)
                | (Self::AwaitingEndorsements, Self::Submitting)
                | (Self::Submitting, Self::Finalized)
                | (
                    Self::Building
                        | Self::LocalValidation
                        | Self::AwaitingEndorsements
                        | Self::Submitting,
                    Self::Failed(_)
                )
        )
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Failed(_))
    }
}

impl fmt::Display for ProposalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Building => write!(f, "BUILDING"),
            Self::LocalValidation => write!(f, "LOCAL_VALIDATION"),
            Self::AwaitingEndorsements => write!(f, "AWAITING_ENDORSEMENTS"),
            Self::Submitting => write!(f, "SUBMITTING"),
            Self::Finalized => write!(f, "FINALIZED"),
            Self::Failed(reason) => write!(f, "FAILED({reason})"),
        }
    }
}

/// Initiator-side state machine for a single proposal.
///
/// One instance drives one command; create a new one per proposal.
pub struct ProposalProtocol<L, S, N> {
    party: Arc<Party>,
    lookup: Arc<L>,
    sequencer: Arc<S>,
    counterparties: Arc<N>,
    config: ProtocolConfig,
    phase: ProposalPhase,
}

impl<L, S, N> ProposalProtocol<L, S, N>
where
    L: Lookup,
    S: Sequencer,
    N: Counterparties,
{
    #[must_use]
    pub fn new(
        party: Arc<Party>,
        lookup: Arc<L>,
        sequencer: Arc<S>,
        counterparties: Arc<N>,
        config: ProtocolConfig,
    ) -> Self {
        Self {
            party,
            lookup,
            sequencer,
            counterparties,
            config,
            phase: ProposalPhase::Building,
        }
    }

    #[must_use]
    pub fn phase(&self) -> &ProposalPhase {
        &self.phase
    }

    /// Drive `command` to a committed transition.
    ///
    /// # Errors
    /// - `TitleNotFound` if the title has no live state
    /// - `InvalidTransition` / `NotARequiredSigner` if local validation fails
    /// - `CounterpartyRejected`, `EndorsementTimeout`, `InvalidEndorsement`,
    ///   `SessionClosed`, `UnknownCounterparty` while collecting endorsements
    /// - `Conflict` / `SequencerRejected` from the sequencer
    /// - `WrongPhase` if this proposal has already run
    pub async fn run(&mut self, command: Command) -> Result<CommittedTransition> {
        if self.phase != ProposalPhase::Building {
            return Err(RemsError::WrongPhase {
                from: self.phase.to_string(),
                to: ProposalPhase::LocalValidation.to_string(),
            });
        }

        match self.execute(command).await {
            Ok(committed) => Ok(committed),
            Err(err) => {
                tracing::warn!(
                    party = %self.party.id(),
                    phase = %self.phase,
                    error = %err,
                    "proposal failed"
                );
                self.phase = ProposalPhase::Failed(err.to_string());
                Err(err)
            }
        }
    }

    async fn execute(&mut self, command: Command) -> Result<CommittedTransition> {
        // BUILDING
        let kind = command.kind();
        let (inputs, outputs) = self.build(&command).await?;

        // LOCAL_VALIDATION
        self.advance(ProposalPhase::LocalValidation)?;
        let states: Vec<TitleState> = inputs.iter().map(|live| live.state.clone()).collect();
        let signers = rules::required_signers(kind, &states, &outputs);
        let transition = Transition::consuming(kind, inputs, outputs, signers);
        rules::verify(&transition)?;
        if !transition.signers.contains(&self.party.id()) {
            return Err(RemsError::NotARequiredSigner(self.party.id()));
        }

        // AWAITING_ENDORSEMENTS
        self.advance(ProposalPhase::AwaitingEndorsements)?;
        let mut endorsements = self.collect_endorsements(&transition).await?;

        // SUBMITTING
        self.advance(ProposalPhase::Submitting)?;
        endorsements.push(self.party.endorse(&transition));
        let signed = SignedTransition::new(transition, endorsements);
        let tx = signed.hash();

        match self.sequencer.submit(signed).await {
            SubmitOutcome::Committed(committed) => {
                self.advance(ProposalPhase::Finalized)?;
                tracing::info!(
                    party = %self.party.id(),
                    %kind,
                    %tx,
                    sequence = committed.sequence,
                    "transition finalized"
                );
                Ok(committed)
            }
            SubmitOutcome::Conflict { title, reason } => Err(RemsError::Conflict { title, reason }),
            SubmitOutcome::Invalid { reason } => Err(RemsError::SequencerRejected { reason }),
        }
    }

    /// Resolve inputs and construct the single output for `command`.
    async fn build(&self, command: &Command) -> Result<(Vec<LiveTitle>, Vec<TitleState>)> {
        let input = match command.title_id() {
            Some(id) => Some(
                self.lookup
                    .find_unconsumed(id)
                    .await
                    .ok_or(RemsError::TitleNotFound(id))?,
            ),
            None => None,
        };

        let output = match (command, &input) {
            (Command::Register { address }, _) => {
                TitleState::register(self.party.id(), address.clone())
            }
            (Command::Sell { new_owner, .. }, Some(input)) => input.state.with_owner(*new_owner),
            (Command::Rent { new_tenant, .. }, Some(input)) => {
                input.state.with_tenant(Some(*new_tenant))
            }
            (Command::TerminateRent { .. }, Some(input)) => input.state.with_tenant(None),
            (_, None) => {
                return Err(RemsError::Internal(format!(
                    "{} command resolved no input state",
                    command.kind()
                )));
            }
        };

        Ok((input.into_iter().collect(), vec![output]))
    }

    /// Ask every other required signer to endorse, concurrently.
    ///
    /// Completes only when all have endorsed; the first failure drops the
    /// other outstanding sessions.
    async fn collect_endorsements(&self, transition: &Transition) -> Result<Vec<Endorsement>> {
        let me = self.party.id();
        let expected = transition.hash();
        let timeout = self.config.endorsement_timeout();
        let request = ProposalRequest {
            initiator: me,
            transition: transition.clone(),
        };

        let sessions = transition
            .signers
            .iter()
            .filter(|party| **party != me)
            .map(|party| self.counterparties.open_session(*party))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            party = %me,
            tx = %expected,
            counterparties = sessions.len(),
            "requesting endorsements"
        );

        let pending = sessions.into_iter().map(|session| {
            let request = request.clone();
            async move {
                let party = session.counterparty();
                let reply = tokio::time::timeout(timeout, session.send(request))
                    .await
                    .map_err(|_| RemsError::EndorsementTimeout(party))??;
                accept_reply(party, reply, &expected)
            }
        });

        try_join_all(pending).await
    }

    fn advance(&mut self, next: ProposalPhase) -> Result<()> {
        if !self.phase.can_transition_to(&next) {
            return Err(RemsError::WrongPhase {
                from: self.phase.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(party = %self.party.id(), from = %self.phase, to = %next, "proposal phase");
        self.phase = next;
        Ok(())
    }
}

/// Turn a counterparty's reply into a verified endorsement or an error.
fn accept_reply(
    party: PartyId,
    reply: ConsentReply,
    expected: &TransitionHash,
) -> Result<Endorsement> {
    match reply {
        ConsentReply::Endorsed(endorsement) => {
            if endorsement.signer != party {
                return Err(RemsError::InvalidEndorsement {
                    party,
                    reason: format!("reply signed by {}", endorsement.signer),
                });
            }
            endorsement.verify(expected)?;
            Ok(endorsement)
        }
        ConsentReply::Rejected { reason, .. } => {
            Err(RemsError::CounterpartyRejected { party, reason })
        }
    }
}
