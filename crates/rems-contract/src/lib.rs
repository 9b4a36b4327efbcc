//! # rems-contract
//!
//! **Transition rules**: the pure function every party runs to decide
//! whether a proposed title transition is legal.
//!
//! ## Design
//!
//! - **Pure**: no I/O, no clocks, no randomness. The same [`Transition`]
//!   yields the same verdict on the initiator, on every counterparty, and
//!   on the sequencer.
//! - **Exhaustive**: one arm per [`TransitionKind`] and no fallback, so a
//!   new kind cannot compile without rules.
//! - **Specific**: each violated condition has its own [`Rejection`].
//!
//! [`Transition`]: rems_types::Transition
//! [`TransitionKind`]: rems_types::TransitionKind
//! [`Rejection`]: rems_types::Rejection

pub mod rules;

pub use rules::{required_signers, verify, verify_kind};
