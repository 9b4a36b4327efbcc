//! Configuration types for REMS parties.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{RemsError, Result, constants};

/// Settings for the proposal and consent protocols run by one party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// How long the initiator waits for each counterparty (milliseconds).
    pub endorsement_timeout_ms: u64,
    /// Request channel capacity of each in-process consent session.
    pub session_buffer: usize,
    /// Logging output.
    pub log: LogConfig,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            endorsement_timeout_ms: constants::DEFAULT_ENDORSEMENT_TIMEOUT_MS,
            session_buffer: constants::DEFAULT_SESSION_BUFFER,
            log: LogConfig::default(),
        }
    }
}

impl ProtocolConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| RemsError::Configuration(format!("invalid protocol config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the protocols cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.endorsement_timeout_ms == 0 {
            return Err(RemsError::Configuration(
                "endorsement_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.session_buffer == 0 {
            return Err(RemsError::Configuration(
                "session_buffer must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn endorsement_timeout(&self) -> Duration {
        Duration::from_millis(self.endorsement_timeout_ms)
    }
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: constants::DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}
