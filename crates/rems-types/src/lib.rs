//! # rems-types
//!
//! Shared types, errors, and configuration for **REMS**, the multi-party
//! real estate title ledger.
//!
//! This crate is the leaf dependency of the workspace: every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`TitleId`], [`PartyId`], [`TransitionHash`]
//! - **Title model**: [`TitleState`]
//! - **Requests**: [`Command`], [`TransitionKind`]
//! - **Transitions**: [`Transition`], [`StateRef`], [`LiveTitle`], [`Endorsement`], [`SignedTransition`], [`CommittedTransition`]
//! - **Rule violations**: [`Rejection`]
//! - **Configuration**: [`ProtocolConfig`], [`LogConfig`]
//! - **Errors**: [`RemsError`] with `REMS_ERR_` prefix codes
//! - **Constants**: system-wide defaults

pub mod command;
pub mod config;
pub mod constants;
pub mod endorsement;
pub mod error;
pub mod ids;
pub mod rejection;
pub mod title;
pub mod transition;

// Re-export all primary types at crate root for ergonomic imports:
//   use rems_types::{TitleState, Transition, Rejection, ...};

pub use command::*;
pub use config::*;
pub use endorsement::*;
pub use error::*;
pub use ids::*;
pub use rejection::*;
pub use title::*;
pub use transition::*;

// Constants are accessed via `rems_types::constants::FOO`
// (not re-exported to avoid name collisions).
