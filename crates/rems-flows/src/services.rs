//! External collaborators: the lookup service and the sequencer.
//!
//! Both are consumed through narrow traits. The protocols never assume
//! anything about storage or ordering beyond what these signatures promise.

use async_trait::async_trait;
use rems_types::{CommittedTransition, LiveTitle, SignedTransition, TitleId};

/// Resolves a title id to its current unconsumed state.
#[async_trait]
pub trait Lookup: Send + Sync {
    /// The live state of `id` and where it was produced, or `None` if
    /// unknown.
    async fn find_unconsumed(&self, id: TitleId) -> Option<LiveTitle>;
}

/// What the sequencer did with a submitted transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Ordered and final. Inputs are consumed, outputs are live.
    Committed(CommittedTransition),
    /// An input is no longer live: another transition consumed it first.
    /// Inputs are matched by [`StateRef`](rems_types::StateRef), not content.
    Conflict { title: TitleId, reason: String },
    /// The sequencer's own validation refused the transition.
    Invalid { reason: String },
}

/// Global ordering and uniqueness of consumed states.
///
/// Implementations are expected to re-run the transition rules and verify
/// endorsements themselves. A `Conflict` is possible even after the
/// initiator and every counterparty validated successfully.
#[async_trait]
pub trait Sequencer: Send + Sync {
    async fn submit(&self, signed: SignedTransition) -> SubmitOutcome;
}
