//! Logging setup.
//!
//! Trellis emits `tracing` events: `debug` for compiled locators and
//! lifecycle transitions, `warn` for frame exit failures and configuration
//! fallbacks. [`init`] installs a `fmt` subscriber filtered by the configured
//! levels; `RUST_LOG` overrides them.

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;
use crate::result::{TrellisError, TrellisResult};

/// Build the filter for `config`, preferring `RUST_LOG` when set
pub fn env_filter(config: &LogConfig) -> TrellisResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.directives()))
        .map_err(|e| TrellisError::Config {
            message: format!("invalid log directives '{}': {e}", config.directives()),
        })
}

/// Install the global subscriber
///
/// Returns `false` when a subscriber was already installed, which leaves the
/// existing one in place.
pub fn init(config: &LogConfig) -> TrellisResult<bool> {
    let filter = env_filter(config)?;
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = LogConfig::default();
        init(&config).unwrap();
        assert!(!init(&config).unwrap());
    }

    #[test]
    fn test_invalid_level_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LogConfig {
            root_level: "info".into(),
            trellis_level: "very-loud=[".into(),
        };
        assert!(env_filter(&config).is_err());
    }
}
