//! Ambient configuration for processes embedding the decider core.
//!
//! The core itself reads no environment variables mid-`eval` (that would
//! violate determinism); this is configuration for the surrounding process
//! that constructs a [`crate::state_machine::StateMachine`] and initializes logging.

use std::env;

/// Env-var-driven, `Default`-backed configuration, in the same shape the
/// surrounding cronflow process uses for its own tunables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Prefix used when reading env vars, e.g. `"DECIDER"` reads `DECIDER_LOG_LEVEL`.
    pub env_prefix: String,
    /// Default log level passed to `env_logger` when `RUST_LOG` is unset.
    pub default_log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let env_prefix = env::var("DECIDER_ENV_PREFIX").unwrap_or_else(|_| "DECIDER".to_string());

        let default_log_level = env::var(format!("{}_LOG_LEVEL", env_prefix))
            .ok()
            .unwrap_or_else(|| "info".to_string());

        Self {
            env_prefix,
            default_log_level,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
