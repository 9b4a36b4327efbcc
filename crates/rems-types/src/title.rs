//! # TitleState: one title record at one point in its history
//!
//! A `TitleState` is an immutable value. A transition never edits a state;
//! it consumes one and produces a whole new one carrying the same `id` and
//! `address`.
//!
//! ## Lifecycle
//!
//! ```text
//!   Register           Sell / Rent / TerminateRent
//!  ──────────▶ state₀ ─────────────────────────────▶ state₁ ─▶ …
//!                (consumed)                           (live)
//! ```
//!
//! Which states are live and which are consumed is owned by the sequencer,
//! never by the value itself.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{PartyId, TitleId};

/// One title record at one point in its history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TitleState {
    /// Stable id assigned at registration.
    pub id: TitleId,
    /// Current legal owner.
    pub owner: PartyId,
    /// Current renter, if the title is rented.
    pub tenant: Option<PartyId>,
    /// Free-form description of the property. Never changes.
    pub address: String,
}

impl TitleState {
    /// A freshly registered title: new id, no tenant.
    #[must_use]
    pub fn register(owner: PartyId, address: impl Into<String>) -> Self {
        Self {
            id: TitleId::new(),
            owner,
            tenant: None,
            address: address.into(),
        }
    }

    /// Copy of this state with only the owner replaced.
    #[must_use]
    pub fn with_owner(&self, owner: PartyId) -> Self {
        Self {
            owner,
            ..self.clone()
        }
    }

    /// Copy of this state with only the tenant replaced.
    #[must_use]
    pub fn with_tenant(&self, tenant: Option<PartyId>) -> Self {
        Self {
            tenant,
            ..self.clone()
        }
    }

    /// Copy of this state with only the address replaced.
    ///
    /// No transition may do this; it exists so callers (and tests) can build
    /// the illegal candidates the rules must catch.
    #[must_use]
    pub fn with_address(&self, address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..self.clone()
        }
    }

    /// The owner plus the tenant, if any.
    #[must_use]
    pub fn participants(&self) -> BTreeSet<PartyId> {
        std::iter::once(self.owner).chain(self.tenant).collect()
    }

    /// Whether `party` is the owner or the tenant.
    #[must_use]
    pub fn is_participant(&self, party: &PartyId) -> bool {
        self.owner == *party || self.tenant.as_ref() == Some(party)
    }

    #[must_use]
    pub fn is_rented(&self) -> bool {
        self.tenant.is_some()
    }

    /// Canonical bytes fed into the transition signing payload.
    ///
    /// Format: `id || owner || tenant_flag [|| tenant] || address_len (u64 le) || address`
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + 32 + 1 + 32 + 8 + self.address.len());
        out.extend_from_slice(self.id.as_bytes());
        out.extend_from_slice(self.owner.as_bytes());
        match &self.tenant {
            Some(tenant) => {
                out.push(1);
                out.extend_from_slice(tenant.as_bytes());
            }
            None => out.push(0),
        }
        out.extend_from_slice(&(self.address.len() as u64).to_le_bytes());
        out.extend_from_slice(self.address.as_bytes());
        out
    }
}
