//! # rems-flows
//!
//! Multi-party protocols for **REMS**: how a proposed title transition
//! gathers the endorsements of everyone it affects and gets committed.
//!
//! - [`ProposalProtocol`]: initiator side, from command to committed transition
//! - [`ConsentProtocol`]: responder side, independent validation then endorse or reject
//! - [`Lookup`] / [`Sequencer`]: external collaborators, behind narrow traits
//! - [`Session`] / [`Counterparties`]: one conversation per counterparty
//! - [`LocalNetwork`]: in-process transport over tokio channels
//! - [`InMemoryLedger`]: single-node lookup and sequencer with a consumed set
//!
//! ## Flow
//!
//! ```text
//!  initiator                       counterparties              sequencer
//!  ─────────                       ──────────────              ─────────
//!  build + verify locally
//!  ── ProposalRequest ───────────▶ recompute signers
//!                                  verify rules, policy
//!  ◀──────────── ConsentReply ──── endorse | reject
//!  all endorsed? ── SignedTransition ─────────────────────────▶ re-verify,
//!                                                              check consumed,
//!  ◀──────────────────────────────── CommittedTransition ───── commit
//! ```

pub mod consent;
pub mod ledger;
pub mod network;
pub mod party;
pub mod proposal;
pub mod services;
pub mod session;
pub mod telemetry;

pub use consent::{AcceptAll, ConsentPhase, ConsentPolicy, ConsentProtocol, DeclineKinds};
pub use ledger::InMemoryLedger;
pub use network::LocalNetwork;
pub use party::Party;
pub use proposal::{ProposalPhase, ProposalProtocol};
pub use services::{Lookup, Sequencer, SubmitOutcome};
pub use session::{ConsentReply, Counterparties, ProposalRequest, Session};
pub use telemetry::init_tracing;
