//! Configuration
//!
//! Immutable settings shared by every component of a session. Loaded from a
//! YAML file such as:
//!
//! ```yaml
//! browser: firefox
//! headless: true
//! wait-timeout-ms: 8000
//! poll-interval-ms: 100
//! log:
//!   root-level: warn
//!   trellis-level: debug
//! ```
//!
//! Missing keys keep their defaults.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::result::{TrellisError, TrellisResult};

/// Default wait budget (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Browser the session drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    /// Chrome or Chromium
    #[default]
    Chrome,
    /// Firefox
    Firefox,
    /// Edge
    Edge,
    /// Safari
    Safari,
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chrome => write!(f, "chrome"),
            Self::Firefox => write!(f, "firefox"),
            Self::Edge => write!(f, "edge"),
            Self::Safari => write!(f, "safari"),
        }
    }
}

/// Log levels for the subscriber installed by [`crate::logging::init`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LogConfig {
    /// Level for every other crate
    pub root_level: String,
    /// Level for trellis itself
    pub trellis_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            root_level: "info".to_string(),
            trellis_level: "debug".to_string(),
        }
    }
}

impl LogConfig {
    /// `EnvFilter` directives for these levels
    #[must_use]
    pub fn directives(&self) -> String {
        format!("{},trellis={}", self.root_level, self.trellis_level)
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TrellisConfig {
    /// Browser to drive
    pub browser: Browser,
    /// Run without a visible window
    pub headless: bool,
    /// Budget for every readiness wait
    pub wait_timeout_ms: u64,
    /// Pause between wait evaluations
    pub poll_interval_ms: u64,
    /// Logging levels
    pub log: LogConfig,
}

impl Default for TrellisConfig {
    fn default() -> Self {
        Self {
            browser: Browser::default(),
            headless: false,
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            log: LogConfig::default(),
        }
    }
}

impl TrellisConfig {
    /// Set the browser
    #[must_use]
    pub const fn with_browser(mut self, browser: Browser) -> Self {
        self.browser = browser;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the wait budget
    #[must_use]
    pub const fn with_wait_timeout(mut self, timeout_ms: u64) -> Self {
        self.wait_timeout_ms = timeout_ms;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    /// Set the log levels
    #[must_use]
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Wait budget as a duration
    #[must_use]
    pub const fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Polling interval as a duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Parse YAML
    pub fn from_yaml_str(yaml: &str) -> TrellisResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> TrellisResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Read a YAML file, falling back to defaults when it is missing or invalid
    #[must_use]
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no configuration file, using defaults");
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unable to load configuration, using defaults");
                Self::default()
            }
        }
    }

    fn validate(&self) -> TrellisResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(TrellisError::Config {
                message: "poll-interval-ms must be greater than zero".to_string(),
            });
        }
        if self.poll_interval_ms > self.wait_timeout_ms {
            return Err(TrellisError::Config {
                message: format!(
                    "poll-interval-ms ({}) exceeds wait-timeout-ms ({})",
                    self.poll_interval_ms, self.wait_timeout_ms
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod default_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = TrellisConfig::default();
            assert_eq!(config.browser, Browser::Chrome);
            assert!(!config.headless);
            assert_eq!(config.wait_timeout(), Duration::from_secs(5));
            assert_eq!(config.poll_interval(), Duration::from_millis(50));
            assert_eq!(config.log.directives(), "info,trellis=debug");
        }

        #[test]
        fn test_builders() {
            let config = TrellisConfig::default()
                .with_browser(Browser::Firefox)
                .with_headless(true)
                .with_wait_timeout(200)
                .with_poll_interval(20);
            assert_eq!(config.browser, Browser::Firefox);
            assert!(config.headless);
            assert_eq!(config.wait_timeout_ms, 200);
            assert_eq!(config.poll_interval_ms, 20);
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_partial_yaml_keeps_defaults() {
            let config = TrellisConfig::from_yaml_str("browser: edge\nwait-timeout-ms: 8000\n").unwrap();
            assert_eq!(config.browser, Browser::Edge);
            assert_eq!(config.wait_timeout_ms, 8000);
            assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
            assert_eq!(config.log, LogConfig::default());
        }

        #[test]
        fn test_nested_log_levels() {
            let yaml = "log:\n  root-level: warn\n  trellis-level: trace\n";
            let config = TrellisConfig::from_yaml_str(yaml).unwrap();
            assert_eq!(config.log.directives(), "warn,trellis=trace");
        }

        #[test]
        fn test_zero_poll_interval_rejected() {
            let err = TrellisConfig::from_yaml_str("poll-interval-ms: 0\n").unwrap_err();
            assert!(matches!(err, TrellisError::Config { .. }));
        }

        #[test]
        fn test_unknown_browser_rejected() {
            let err = TrellisConfig::from_yaml_str("browser: lynx\n").unwrap_err();
            assert!(matches!(err, TrellisError::Yaml(_)));
        }
    }

    mod file_tests {
        use super::*;
        use std::io::Write;

        #[test]
        fn test_from_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "headless: true\npoll-interval-ms: 25").unwrap();
            let config = TrellisConfig::from_file(file.path()).unwrap();
            assert!(config.headless);
            assert_eq!(config.poll_interval_ms, 25);
        }

        #[test]
        fn test_load_or_default_falls_back() {
            let dir = tempfile::tempdir().unwrap();
            let missing = dir.path().join("trellis.yaml");
            assert_eq!(TrellisConfig::load_or_default(&missing), TrellisConfig::default());

            std::fs::write(&missing, "wait-timeout-ms: [not, a, number]\n").unwrap();
            assert_eq!(TrellisConfig::load_or_default(&missing), TrellisConfig::default());

            std::fs::write(&missing, "wait-timeout-ms: 900\n").unwrap();
            assert_eq!(TrellisConfig::load_or_default(&missing).wait_timeout_ms, 900);
        }
    }
}
