//! Transition requests.
//!
//! [`TransitionKind`] is the tag a transition carries and the rules match
//! on. [`Command`] is what a caller asks the proposal protocol to do: the
//! kind plus its parameters. These four are the entire public vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{PartyId, TitleId};

/// The four kinds of title transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum TransitionKind {
    /// Create a title. No inputs, one output.
    Register,
    /// Change the owner.
    Sell,
    /// Set a tenant on a title that has none.
    Rent,
    /// Remove the current tenant.
    TerminateRent,
}

impl TransitionKind {
    /// Single-byte tag used in the canonical signing payload.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Register => 1,
            Self::Sell => 2,
            Self::Rent => 3,
            Self::TerminateRent => 4,
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register => write!(f, "REGISTER"),
            Self::Sell => write!(f, "SELL"),
            Self::Rent => write!(f, "RENT"),
            Self::TerminateRent => write!(f, "TERMINATE_RENT"),
        }
    }
}

/// A transition request with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Register a new title owned by the initiator.
    Register { address: String },
    /// Sell title `id` to `new_owner`.
    Sell { id: TitleId, new_owner: PartyId },
    /// Rent title `id` to `new_tenant`.
    Rent { id: TitleId, new_tenant: PartyId },
    /// End the current rent on title `id`.
    TerminateRent { id: TitleId },
}

impl Command {
    #[must_use]
    pub fn kind(&self) -> TransitionKind {
        match self {
            Self::Register { .. } => TransitionKind::Register,
            Self::Sell { .. } => TransitionKind::Sell,
            Self::Rent { .. } => TransitionKind::Rent,
            Self::TerminateRent { .. } => TransitionKind::TerminateRent,
        }
    }

    /// The title this command consumes, or `None` for a registration.
    #[must_use]
    pub fn title_id(&self) -> Option<TitleId> {
        match self {
            Self::Register { .. } => None,
            Self::Sell { id, .. } | Self::Rent { id, .. } | Self::TerminateRent { id } => Some(*id),
        }
    }
}
