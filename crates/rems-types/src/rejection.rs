//! Why a transition was rejected.
//!
//! Every rule in the contract has its own variant, so the initiator, every
//! counterparty, and the sequencer all name the same violated rule. The
//! `Display` text is the human-readable rule; [`Rejection::code`] is the
//! stable machine code.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single violated transition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rejection {
    /// Zero or more than one transition kind on one transition.
    AmbiguousKind { found: usize },

    // Register
    RegisterConsumesInputs,
    RegisterOutputCount,
    RegisterHasTenant,
    RegisterSigners,

    // Sell
    SellInputCount,
    SellOutputCount,
    SellOwnerUnchanged,
    SellOtherFieldsChanged,
    SellBuyerIsTenant,
    SellSigners,

    // Rent
    RentInputCount,
    RentOutputCount,
    RentPreviousTenant,
    RentNoNewTenant,
    RentOtherFieldsChanged,
    RentOwnerIsTenant,
    RentSigners,

    // TerminateRent
    TerminateInputCount,
    TerminateOutputCount,
    TerminateNoTenant,
    TerminateTenantNotRemoved,
    TerminateOtherFieldsChanged,
    TerminateSigners,
}

impl Rejection {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AmbiguousKind { .. } => "AMBIGUOUS_KIND",
            Self::RegisterConsumesInputs => "REGISTER_INPUTS",
            Self::RegisterOutputCount => "REGISTER_OUTPUTS",
            Self::RegisterHasTenant => "REGISTER_TENANT",
            Self::RegisterSigners => "REGISTER_SIGNERS",
            Self::SellInputCount => "SELL_INPUTS",
            Self::SellOutputCount => "SELL_OUTPUTS",
            Self::SellOwnerUnchanged => "SELL_OWNER_UNCHANGED",
            Self::SellOtherFieldsChanged => "SELL_ONLY_OWNER",
            Self::SellBuyerIsTenant => "SELL_BUYER_IS_TENANT",
            Self::SellSigners => "SELL_SIGNERS",
            Self::RentInputCount => "RENT_INPUTS",
            Self::RentOutputCount => "RENT_OUTPUTS",
            Self::RentPreviousTenant => "RENT_PREVIOUS_TENANT",
            Self::RentNoNewTenant => "RENT_NO_TENANT",
            Self::RentOtherFieldsChanged => "RENT_ONLY_TENANT",
            Self::RentOwnerIsTenant => "RENT_OWNER_IS_TENANT",
            Self::RentSigners => "RENT_SIGNERS",
            Self::TerminateInputCount => "TERMINATE_INPUTS",
            Self::TerminateOutputCount => "TERMINATE_OUTPUTS",
            Self::TerminateNoTenant => "TERMINATE_NO_TENANT",
            Self::TerminateTenantNotRemoved => "TERMINATE_TENANT_KEPT",
            Self::TerminateOtherFieldsChanged => "TERMINATE_ONLY_TENANT",
            Self::TerminateSigners => "TERMINATE_SIGNERS",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::AmbiguousKind { found } => {
                return write!(
                    f,
                    "Ambiguous or missing transition kind: expected exactly one, found {found}"
                );
            }
            Self::RegisterConsumesInputs => {
                "No input states should be consumed when registering a real estate"
            }
            Self::RegisterOutputCount => {
                "A single output state should be produced when registering a real estate"
            }
            Self::RegisterHasTenant => "There should be no tenant when registering a real estate",
            Self::RegisterSigners => {
                "The owner should sign the transaction when registering a real estate"
            }
            Self::SellInputCount => "A single input state should be consumed when selling a real estate",
            Self::SellOutputCount => {
                "A single output state should be produced when selling a real estate"
            }
            Self::SellOwnerUnchanged => "The owner should change when selling a real estate",
            Self::SellOtherFieldsChanged => "Only the owner should change when selling a real estate",
            Self::SellBuyerIsTenant => {
                "The tenant and the buyer should be different when selling a real estate"
            }
            Self::SellSigners => {
                "All affected parties should sign the transaction when a real estate is being sold"
            }
            Self::RentInputCount => "A single input state should be consumed when renting a real estate",
            Self::RentOutputCount => {
                "A single output state should be produced when renting a real estate"
            }
            Self::RentPreviousTenant => "There should be no previous tenant when renting a real estate",
            Self::RentNoNewTenant => "The tenant should change when renting a real estate",
            Self::RentOtherFieldsChanged => "Only the tenant should change when renting a real estate",
            Self::RentOwnerIsTenant => {
                "The owner and the tenant should be different when renting a real estate"
            }
            Self::RentSigners => {
                "Both owner and tenant should sign the transaction when renting a real estate"
            }
            Self::TerminateInputCount => {
                "A single input state should be consumed when terminating a real estate rent"
            }
            Self::TerminateOutputCount => {
                "A single output state should be produced when terminating a real estate rent"
            }
            Self::TerminateNoTenant => "There should be a tenant before terminating a real estate rent",
            Self::TerminateTenantNotRemoved => {
                "The tenant should be removed when terminating a real estate rent"
            }
            Self::TerminateOtherFieldsChanged => {
                "Only the tenant should change when terminating a real estate rent"
            }
            Self::TerminateSigners => {
                "Both owner and tenant should sign the transaction when terminating a real estate rent"
            }
        };
        f.write_str(msg)
    }
}
