//! Wait Engine (Feature 3)
//!
//! Bounded polling of a condition on the caller's thread.
//!
//! - The condition is evaluated immediately; success returns without sleeping
//! - Between evaluations the engine sleeps `min(poll_interval, remaining)`
//! - The deadline is wall-clock time since the wait started, checked before
//!   every re-evaluation; no evaluation starts once the budget is spent
//! - Transient failures (element missing, stale handle, transient driver
//!   errors) count as "not yet"; every other error ends the wait at once
//! - On timeout the last evaluation's transient failure is chained as the
//!   cause; a later clean `false` clears it

use std::fmt;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::config::{TrellisConfig, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};
use crate::result::{Cause, TrellisError, TrellisResult};

// =============================================================================
// WAIT
// =============================================================================

/// Timeout and polling interval of a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for Wait {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        )
    }
}

/// Statistics of a successful wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOutcome {
    /// Time until the condition held
    pub elapsed: Duration,
    /// Number of evaluations, including the successful one
    pub evaluations: u32,
}

impl Wait {
    /// Create a wait
    #[must_use]
    pub const fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Wait using the configured budget
    #[must_use]
    pub const fn from_config(config: &TrellisConfig) -> Self {
        Self::new(config.wait_timeout(), config.poll_interval())
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Polling interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Timeout in milliseconds
    #[must_use]
    pub const fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Block until `condition` returns `true`
    pub fn until<F>(&self, mut condition: F) -> TrellisResult<WaitOutcome>
    where
        F: FnMut() -> TrellisResult<bool>,
    {
        self.poll(|| condition().map(|met| met.then_some(())))
            .map(|((), outcome)| outcome)
    }

    /// Block until `attempt` produces a value
    pub fn until_some<T, F>(&self, attempt: F) -> TrellisResult<T>
    where
        F: FnMut() -> TrellisResult<Option<T>>,
    {
        self.poll(attempt).map(|(value, _)| value)
    }

    fn poll<T, F>(&self, mut attempt: F) -> TrellisResult<(T, WaitOutcome)>
    where
        F: FnMut() -> TrellisResult<Option<T>>,
    {
        let start = Instant::now();
        let mut evaluations = 0_u32;
        let mut last_failure: Cause = None;

        loop {
            evaluations += 1;
            match attempt() {
                Ok(Some(value)) => {
                    let outcome = WaitOutcome {
                        elapsed: start.elapsed(),
                        evaluations,
                    };
                    trace!(elapsed_ms = outcome.elapsed.as_millis() as u64, evaluations, "wait satisfied");
                    return Ok((value, outcome));
                }
                Ok(None) => last_failure = None,
                Err(err) if err.is_transient() => last_failure = Some(Box::new(err)),
                Err(err) => return Err(err),
            }

            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                return Err(self.timed_out(evaluations, last_failure));
            }
            sleep(self.poll_interval.min(self.timeout - elapsed));
            if start.elapsed() >= self.timeout {
                return Err(self.timed_out(evaluations, last_failure));
            }
        }
    }

    fn timed_out(&self, evaluations: u32, last_failure: Cause) -> TrellisError {
        trace!(timeout_ms = self.timeout_ms(), evaluations, "wait timed out");
        TrellisError::WaitTimeout {
            timeout_ms: self.timeout_ms(),
            source: last_failure,
        }
    }
}

/// Block the current thread
pub fn sleep(duration: Duration) {
    std::thread::sleep(duration);
}

// =============================================================================
// NAMED WAITS
// =============================================================================

/// Readiness condition awaited on a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitFor {
    /// Resolves to an element
    Present,
    /// Present and visible
    Displayed,
    /// Present and interactable
    Enabled,
    /// Geometry unchanged across one poll interval
    StoppedAnimating,
    /// Not visible, or not present at all
    Hidden,
    /// Not present
    Absent,
    /// Present and not interactable
    Disabled,
}

impl fmt::Display for WaitFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Present => "present",
            Self::Displayed => "displayed",
            Self::Enabled => "enabled",
            Self::StoppedAnimating => "stopped animating",
            Self::Hidden => "hidden",
            Self::Absent => "absent",
            Self::Disabled => "disabled",
        };
        write!(f, "{name}")
    }
}

impl WaitFor {
    /// Replace a generic wait timeout with this condition's error
    ///
    /// Errors other than `WaitTimeout` pass through unchanged.
    #[must_use]
    pub fn timeout_error(self, component: &str, expression: &str, err: TrellisError) -> TrellisError {
        let TrellisError::WaitTimeout { timeout_ms, source } = err else {
            return err;
        };
        let component = component.to_string();
        match self {
            Self::Present => TrellisError::ElementNotFound {
                expression: expression.to_string(),
                timeout_ms: Some(timeout_ms),
                reason: format!("{component} did not resolve within {timeout_ms}ms"),
                source,
            },
            Self::Displayed => TrellisError::ComponentNotDisplayed {
                component,
                timeout_ms,
                source,
            },
            Self::Enabled => TrellisError::ComponentNotEnabled {
                component,
                timeout_ms,
                source,
            },
            Self::StoppedAnimating => TrellisError::ComponentAnimating {
                component,
                timeout_ms,
                source,
            },
            Self::Hidden | Self::Absent | Self::Disabled => TrellisError::ComponentWait {
                component,
                condition: self.to_string(),
                timeout_ms,
                source,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn quick() -> Wait {
        Wait::new(Duration::from_millis(200), Duration::from_millis(50))
    }

    fn not_found() -> TrellisError {
        TrellisError::ElementNotFound {
            expression: "css=#x".into(),
            timeout_ms: None,
            reason: "no element matched".into(),
            source: None,
        }
    }

    mod timing_tests {
        use super::*;

        #[test]
        fn test_immediate_success_does_not_sleep() {
            let outcome = quick().until(|| Ok(true)).unwrap();
            assert_eq!(outcome.evaluations, 1);
            assert!(outcome.elapsed < Duration::from_millis(50));
        }

        #[test]
        fn test_condition_met_before_deadline() {
            let start = Instant::now();
            let outcome = quick()
                .until(|| Ok(start.elapsed() >= Duration::from_millis(120)))
                .unwrap();
            assert!(outcome.elapsed >= Duration::from_millis(120));
            assert!(outcome.elapsed < Duration::from_millis(200));
        }

        #[test]
        fn test_never_true_times_out_within_one_interval() {
            let start = Instant::now();
            let err = quick().until(|| Ok(false)).unwrap_err();
            let elapsed = start.elapsed();
            assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
            assert!(elapsed < Duration::from_millis(250), "{elapsed:?}");
            assert!(matches!(err, TrellisError::WaitTimeout { timeout_ms: 200, source: None }));
        }

        #[test]
        fn test_no_evaluation_starts_after_deadline() {
            let start = Instant::now();
            let mut started_at = Vec::new();
            let _ = quick().until(|| {
                started_at.push(start.elapsed());
                Ok(false)
            });
            assert!(started_at.len() >= 3, "{started_at:?}");
            assert!(
                started_at.iter().all(|at| *at < Duration::from_millis(200)),
                "{started_at:?}"
            );
        }

        #[test]
        fn test_slow_condition_does_not_overrun_budget() {
            let start = Instant::now();
            let mut evaluations = 0;
            let err = quick()
                .until(|| {
                    evaluations += 1;
                    sleep(Duration::from_millis(150));
                    Ok(false)
                })
                .unwrap_err();
            let elapsed = start.elapsed();
            assert!(matches!(err, TrellisError::WaitTimeout { timeout_ms: 200, .. }));
            assert_eq!(evaluations, 1);
            assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
            assert!(elapsed < Duration::from_millis(250), "{elapsed:?}");
        }
    }

    mod failure_tests {
        use super::*;

        #[test]
        fn test_transient_failures_are_retried_and_chained() {
            let err = quick().until(|| Err(not_found())).unwrap_err();
            assert!(matches!(
                err.cause(),
                Some(TrellisError::ElementNotFound { .. })
            ));
        }

        #[test]
        fn test_clean_false_clears_cause() {
            let mut calls = 0;
            let err = quick()
                .until(|| {
                    calls += 1;
                    if calls == 1 {
                        Err(not_found())
                    } else {
                        Ok(false)
                    }
                })
                .unwrap_err();
            assert!(err.cause().is_none());
        }

        #[test]
        fn test_fatal_error_propagates_immediately() {
            let start = Instant::now();
            let err = quick()
                .until(|| Err(TrellisError::driver("session closed")))
                .unwrap_err();
            assert!(matches!(err, TrellisError::Driver { transient: false, .. }));
            assert!(start.elapsed() < Duration::from_millis(50));
        }

        #[test]
        fn test_until_some_returns_value() {
            let mut calls = 0;
            let value = quick()
                .until_some(|| {
                    calls += 1;
                    Ok((calls == 3).then_some("ready"))
                })
                .unwrap();
            assert_eq!(value, "ready");
        }
    }

    mod named_wait_tests {
        use super::*;

        fn timeout() -> TrellisError {
            TrellisError::WaitTimeout {
                timeout_ms: 300,
                source: Some(Box::new(not_found())),
            }
        }

        #[test]
        fn test_named_errors() {
            let err = WaitFor::Displayed.timeout_error("Dialog", "css=dialog", timeout());
            assert!(matches!(
                err,
                TrellisError::ComponentNotDisplayed { timeout_ms: 300, .. }
            ));
            assert!(err.cause().is_some());

            let err = WaitFor::Present.timeout_error("Button", "css=button", timeout());
            assert!(matches!(
                err,
                TrellisError::ElementNotFound { timeout_ms: Some(300), .. }
            ));

            let err = WaitFor::StoppedAnimating.timeout_error("Button", "css=button", timeout());
            assert!(matches!(
                err,
                TrellisError::ComponentAnimating { ref component, timeout_ms: 300, .. } if component == "Button"
            ));
            assert!(err.to_string().contains("still animating"));

            let err = WaitFor::Hidden.timeout_error("Dialog", "css=dialog", timeout());
            assert!(err.to_string().contains("hidden"));
        }

        #[test]
        fn test_other_errors_pass_through() {
            let err = WaitFor::Enabled.timeout_error("Button", "css=button", TrellisError::driver("gone"));
            assert!(matches!(err, TrellisError::Driver { .. }));
        }
    }
}
