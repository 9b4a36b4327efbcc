//! System-wide constants for REMS.

/// Default time a counterparty has to answer an endorsement request.
pub const DEFAULT_ENDORSEMENT_TIMEOUT_MS: u64 = 30_000;

/// Default capacity of an in-process session's request channel.
pub const DEFAULT_SESSION_BUFFER: usize = 64;

/// Default tracing filter directive when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Domain tag prefixed to every transition signing payload.
pub const TRANSITION_DOMAIN_TAG: &[u8] = b"rems:transition:v1:";
