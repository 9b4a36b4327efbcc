//! In-memory ledger: a [`Lookup`] and [`Sequencer`] over one shared view.
//!
//! Like a UTXO set: each title has exactly one live state, addressed by the
//! [`StateRef`] of the transition that produced it, and a state consumed by
//! a committed transition can never be consumed again, even when a later
//! state of the same title has identical content.
//! Submissions are validated again here, independently of whoever
//! proposed them.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use rems_contract::rules;
use rems_types::{
    CommittedTransition, LiveTitle, PartyId, SignedTransition, StateRef, TitleId, TitleState,
    Transition, TransitionKind,
};
use tokio::sync::RwLock;

use crate::services::{Lookup, Sequencer, SubmitOutcome};

#[derive(Default)]
struct LedgerState {
    /// Current unconsumed state per title.
    live: HashMap<TitleId, LiveTitle>,
    /// Every state consumed by a committed transition.
    consumed: HashSet<StateRef>,
    /// Committed transitions in sequence order.
    history: Vec<CommittedTransition>,
    next_sequence: u64,
}

/// Single-node ledger shared by every party in a process.
#[derive(Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Live titles `party` owns or rents, ordered by title id.
    pub async fn unconsumed_for(&self, party: &PartyId) -> Vec<TitleState> {
        let state = self.state.read().await;
        let mut titles: Vec<TitleState> = state
            .live
            .values()
            .map(|live| &live.state)
            .filter(|title| title.is_participant(party))
            .cloned()
            .collect();
        titles.sort_by_key(|title| title.id);
        titles
    }

    /// Committed transitions touching `id`, oldest first.
    pub async fn history(&self, id: TitleId) -> Vec<CommittedTransition> {
        let state = self.state.read().await;
        state
            .history
            .iter()
            .filter(|committed| touches(committed.transition(), id))
            .cloned()
            .collect()
    }

    /// Where the live state of `id` was produced.
    pub async fn live_ref(&self, id: TitleId) -> Option<StateRef> {
        self.state.read().await.live.get(&id).map(|live| live.at)
    }

    /// Has the state at `at` been consumed by a committed transition?
    pub async fn is_consumed(&self, at: &StateRef) -> bool {
        self.state.read().await.consumed.contains(at)
    }

    /// Number of committed transitions.
    pub async fn len(&self) -> usize {
        self.state.read().await.history.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn touches(transition: &Transition, id: TitleId) -> bool {
    transition
        .inputs
        .iter()
        .chain(&transition.outputs)
        .any(|title| title.id == id)
}

/// Rules, input refs and endorsements, checked without looking at the
/// ledger contents.
fn validate(signed: &SignedTransition) -> Result<TransitionKind, String> {
    let kind = rules::verify(&signed.transition).map_err(|rule| rule.to_string())?;
    if signed.transition.referenced_inputs().is_none() {
        return Err("every input must carry the ref of the state it consumes".into());
    }
    signed
        .verify_required_signatures()
        .map_err(|err| err.to_string())?;
    Ok(kind)
}

impl LedgerState {
    /// Inputs must be the live states of their titles, by ref and by
    /// content; registered ids must not be taken yet.
    fn check_conflicts(&self, transition: &Transition) -> Result<(), (TitleId, String)> {
        let inputs = transition.referenced_inputs().unwrap_or_default();
        for (at, input) in inputs {
            if self.consumed.contains(&at) {
                return Err((input.id, format!("input state {at} already consumed")));
            }
            match self.live.get(&input.id) {
                Some(live) if live.at == at && live.state == *input => {}
                Some(live) => {
                    return Err((
                        input.id,
                        format!("input {at} is not the live state, which is at {}", live.at),
                    ));
                }
                None => return Err((input.id, "title is not registered".into())),
            }
        }
        for output in &transition.outputs {
            let replaces_input = transition.inputs.iter().any(|input| input.id == output.id);
            if !replaces_input && self.live.contains_key(&output.id) {
                return Err((output.id, "title id is already registered".into()));
            }
        }
        Ok(())
    }

    fn apply(&mut self, signed: SignedTransition) -> CommittedTransition {
        for input in &signed.transition.inputs {
            if let Some(live) = self.live.remove(&input.id) {
                self.consumed.insert(live.at);
            }
        }
        for (at, state) in signed.transition.output_refs() {
            self.live.insert(
                state.id,
                LiveTitle {
                    at,
                    state: state.clone(),
                },
            );
        }
        let committed = CommittedTransition {
            sequence: self.next_sequence,
            signed,
            committed_at: Utc::now(),
        };
        self.next_sequence += 1;
        self.history.push(committed.clone());
        committed
    }
}

#[async_trait]
impl Lookup for InMemoryLedger {
    async fn find_unconsumed(&self, id: TitleId) -> Option<LiveTitle> {
        self.state.read().await.live.get(&id).cloned()
    }
}

#[async_trait]
impl Sequencer for InMemoryLedger {
    async fn submit(&self, signed: SignedTransition) -> SubmitOutcome {
        let tx = signed.hash();
        let kind = match validate(&signed) {
            Ok(kind) => kind,
            Err(reason) => {
                tracing::warn!(%tx, %reason, "sequencer refused transition");
                return SubmitOutcome::Invalid { reason };
            }
        };

        let mut state = self.state.write().await;
        if let Err((title, reason)) = state.check_conflicts(&signed.transition) {
            tracing::warn!(%tx, %title, %reason, "sequencer conflict");
            return SubmitOutcome::Conflict { title, reason };
        }

        let committed = state.apply(signed);
        tracing::info!(%tx, %kind, sequence = committed.sequence, "transition committed");
        SubmitOutcome::Committed(committed)
    }
}
