//! Result and error types for Trellis.

use std::fmt;

use thiserror::Error;

/// Result type for Trellis operations
pub type TrellisResult<T> = Result<T, TrellisError>;

/// Chained cause carried by timeout-class errors
pub type Cause = Option<Box<TrellisError>>;

/// Collection lookup that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKey {
    /// Lookup by the item's key
    Key(String),
    /// Lookup by zero-based position
    Index(usize),
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "key: {key}"),
            Self::Index(index) => write!(f, "index: {index}"),
        }
    }
}

/// Errors that can occur in Trellis
#[derive(Debug, Error)]
pub enum TrellisError {
    /// No element matched the locator and the component rules
    #[error("Element not found: {reason} (locator: {expression})")]
    ElementNotFound {
        /// Compiled locator expression
        expression: String,
        /// Timeout in milliseconds, when raised by a wait
        timeout_ms: Option<u64>,
        /// Why resolution failed
        reason: String,
        /// Last failure observed while waiting
        source: Option<Box<TrellisError>>,
    },

    /// Collection lookup failed
    #[error("Unable to find entry with {0}")]
    EntryNotFound(EntryKey),

    /// Component never became visible
    #[error("Component {component} was not displayed within {timeout_ms}ms")]
    ComponentNotDisplayed {
        /// Component type name
        component: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
        /// Last failure observed while waiting
        source: Option<Box<TrellisError>>,
    },

    /// Component never became interactable
    #[error("Component {component} was not enabled within {timeout_ms}ms")]
    ComponentNotEnabled {
        /// Component type name
        component: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
        /// Last failure observed while waiting
        source: Option<Box<TrellisError>>,
    },

    /// Component geometry never settled
    #[error("Component {component} was still animating after {timeout_ms}ms")]
    ComponentAnimating {
        /// Component type name
        component: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
        /// Last failure observed while waiting
        source: Option<Box<TrellisError>>,
    },

    /// Hidden, absent or disabled wait exhausted
    #[error("Component {component} did not become {condition} within {timeout_ms}ms")]
    ComponentWait {
        /// Component type name
        component: String,
        /// Condition that was awaited
        condition: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
        /// Last failure observed while waiting
        source: Option<Box<TrellisError>>,
    },

    /// Generic wait exhausted
    #[error("Wait time-out: the condition was not met within {timeout_ms}ms")]
    WaitTimeout {
        /// Timeout in milliseconds
        timeout_ms: u64,
        /// Last failure observed while waiting
        source: Option<Box<TrellisError>>,
    },

    /// Component type declared an invalid rule
    #[error("Unable to create component {type_name}: {reason}")]
    ComponentCreation {
        /// Component type name
        type_name: String,
        /// Error message
        reason: String,
    },

    /// Page type failed to build its components
    #[error("Unable to create page {type_name}")]
    PageCreation {
        /// Page type name
        type_name: String,
        /// Failure raised while building the page
        source: Box<TrellisError>,
    },

    /// Page readiness hook failed
    #[error("Unexpected page: {type_name} did not become ready")]
    UnexpectedPage {
        /// Page type name
        type_name: String,
        /// Failure raised by the readiness hook
        source: Box<TrellisError>,
    },

    /// Locator could not be compiled
    #[error("Invalid locator: {reason}")]
    InvalidLocator {
        /// Error message
        reason: String,
    },

    /// Element handle no longer attached to the document
    #[error("Stale element: {handle}")]
    StaleElement {
        /// Handle identifier
        handle: String,
    },

    /// Driver failure
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
        /// Whether retrying may succeed
        transient: bool,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl TrellisError {
    /// Create a non-transient driver error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
            transient: false,
        }
    }

    /// Create a transient driver error
    pub fn transient_driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
            transient: true,
        }
    }

    /// Create an invalid locator error
    pub fn invalid_locator(reason: impl Into<String>) -> Self {
        Self::InvalidLocator {
            reason: reason.into(),
        }
    }

    /// Whether the wait engine treats this failure as "not yet"
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. }
                | Self::StaleElement { .. }
                | Self::Driver {
                    transient: true,
                    ..
                }
        )
    }

    /// Timeout carried by timeout-class errors
    #[must_use]
    pub const fn timeout_ms(&self) -> Option<u64> {
        match self {
            Self::ElementNotFound { timeout_ms, .. } => *timeout_ms,
            Self::ComponentNotDisplayed { timeout_ms, .. }
            | Self::ComponentNotEnabled { timeout_ms, .. }
            | Self::ComponentAnimating { timeout_ms, .. }
            | Self::ComponentWait { timeout_ms, .. }
            | Self::WaitTimeout { timeout_ms, .. } => Some(*timeout_ms),
            _ => None,
        }
    }

    /// Chained cause, if any
    #[must_use]
    pub fn cause(&self) -> Option<&TrellisError> {
        match self {
            Self::ElementNotFound { source, .. }
            | Self::ComponentNotDisplayed { source, .. }
            | Self::ComponentNotEnabled { source, .. }
            | Self::ComponentAnimating { source, .. }
            | Self::ComponentWait { source, .. }
            | Self::WaitTimeout { source, .. } => source.as_deref(),
            Self::PageCreation { source, .. } | Self::UnexpectedPage { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::error::Error as _;

    mod classification_tests {
        use super::*;

        #[test]
        fn test_transient_variants() {
            let not_found = TrellisError::ElementNotFound {
                expression: "button".into(),
                timeout_ms: None,
                reason: "no element matched".into(),
                source: None,
            };
            assert!(not_found.is_transient());
            assert!(TrellisError::StaleElement { handle: "n1".into() }.is_transient());
            assert!(TrellisError::transient_driver("busy").is_transient());
        }

        #[test]
        fn test_non_transient_variants() {
            assert!(!TrellisError::driver("session closed").is_transient());
            assert!(!TrellisError::invalid_locator("empty").is_transient());
            assert!(!TrellisError::EntryNotFound(EntryKey::Index(3)).is_transient());
        }
    }

    mod message_tests {
        use super::*;

        #[test]
        fn test_entry_not_found_message() {
            let err = TrellisError::EntryNotFound(EntryKey::Key("z".into()));
            assert_eq!(err.to_string(), "Unable to find entry with key: z");
            let err = TrellisError::EntryNotFound(EntryKey::Index(5));
            assert_eq!(err.to_string(), "Unable to find entry with index: 5");
        }

        #[test]
        fn test_timeout_and_cause_chain() {
            let err = TrellisError::ComponentNotDisplayed {
                component: "Dialog".into(),
                timeout_ms: 200,
                source: Some(Box::new(TrellisError::StaleElement {
                    handle: "n4".into(),
                })),
            };
            assert_eq!(err.timeout_ms(), Some(200));
            assert!(matches!(
                err.cause(),
                Some(TrellisError::StaleElement { .. })
            ));
            assert!(err.source().is_some());
            assert!(err.to_string().contains("200ms"));
        }

        #[test]
        fn test_error_source_exposes_last_failure() {
            let err = TrellisError::WaitTimeout {
                timeout_ms: 50,
                source: Some(Box::new(TrellisError::transient_driver("busy"))),
            };
            let source = err.source().unwrap();
            assert_eq!(source.to_string(), "Driver error: busy");

            let bare = TrellisError::ComponentAnimating {
                component: "Button".into(),
                timeout_ms: 50,
                source: None,
            };
            assert!(bare.source().is_none());

            let page = TrellisError::UnexpectedPage {
                type_name: "Checkout".into(),
                source: Box::new(bare),
            };
            assert!(page.source().unwrap().to_string().contains("animating"));
        }
    }
}
