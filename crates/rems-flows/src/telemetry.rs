//! Tracing subscriber setup for binaries and tests embedding the protocols.

use rems_types::{LogConfig, RemsError, Result};
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins over `config.filter` when set. Returns `Ok(false)` if a
/// global subscriber was already installed, which is routine in tests.
///
/// # Errors
/// [`RemsError::Configuration`] if `config.filter` is not a valid
/// `EnvFilter` directive.
pub fn init_tracing(config: &LogConfig) -> Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|e| {
            RemsError::Configuration(format!("invalid log filter {:?}: {e}", config.filter))
        })?,
    };

    let installed = if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };
    Ok(installed.is_ok())
}
