//! Wait mechanisms.
//!
//! Every helper operation is a suspension point: it polls a UI condition
//! until it holds or a bound expires. Nothing here retries after the bound;
//! an expired wait is reported to the caller, which decides whether that is
//! a failure (`InteractionTimeout`) or an expected absence (optional steps).

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Default bound for actions and assertions (10 seconds)
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 10_000;

/// Default window for optional-step presence checks (2 seconds)
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;

/// Default bound for page navigation (30 seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Timeout budget shared by every helper in a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Bound for actions (click, fill, check) and assertions
    pub action_ms: u64,
    /// Window for bounded presence checks
    pub probe_ms: u64,
    /// Bound for navigation and wallet extension prompts
    pub navigation_ms: u64,
    /// Polling interval
    pub poll_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            action_ms: DEFAULT_ACTION_TIMEOUT_MS,
            probe_ms: DEFAULT_PROBE_TIMEOUT_MS,
            navigation_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            poll_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Timeouts {
    /// Options for actions and assertions
    #[must_use]
    pub const fn action(&self) -> WaitOptions {
        WaitOptions::new(self.action_ms, self.poll_ms)
    }

    /// Options for presence checks
    #[must_use]
    pub const fn probe(&self) -> WaitOptions {
        WaitOptions::new(self.probe_ms, self.poll_ms)
    }

    /// Options for navigation and extension prompts
    #[must_use]
    pub const fn navigation(&self) -> WaitOptions {
        WaitOptions::new(self.navigation_ms, self.poll_ms)
    }

    /// Scale every bound down for fast in-process runs
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            action_ms: 1_000,
            probe_ms: 150,
            navigation_ms: 1_000,
            poll_ms: 5,
        }
    }
}

/// Options for a single wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::new(DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS)
    }
}

impl WaitOptions {
    /// Create wait options
    #[must_use]
    pub const fn new(timeout_ms: u64, poll_interval_ms: u64) -> Self {
        Self {
            timeout_ms,
            poll_interval_ms,
        }
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Result of a wait operation
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome<T> {
    /// Condition held; carries the observed value and the time spent
    Ready {
        /// Value produced by the probe
        value: T,
        /// Time spent waiting
        elapsed: Duration,
    },
    /// Bound expired; carries the last observation, if any
    Expired {
        /// Last value the probe saw before the bound expired
        last: Option<T>,
    },
}

impl<T> WaitOutcome<T> {
    /// Whether the condition held within the bound
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Convert into the ready value
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready { value, .. } => Some(value),
            Self::Expired { .. } => None,
        }
    }
}

/// Poll `probe` until it reports the condition holds, or the bound expires.
///
/// The probe returns `(holds, observation)`. Errors from the probe abort the
/// wait immediately; they are never retried. The probe runs at least once,
/// even with a zero timeout.
pub async fn poll_until<T, E, F, Fut>(options: WaitOptions, mut probe: F) -> Result<WaitOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(bool, T), E>>,
{
    let start = Instant::now();
    let deadline = start + options.timeout();

    loop {
        let (holds, observed) = probe().await?;
        if holds {
            return Ok(WaitOutcome::Ready {
                value: observed,
                elapsed: start.elapsed(),
            });
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::debug!(
                timeout_ms = options.timeout_ms,
                "wait bound expired"
            );
            return Ok(WaitOutcome::Expired {
                last: Some(observed),
            });
        }
        let remaining = deadline - now;
        tokio::time::sleep(options.poll_interval().min(remaining)).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mod timeouts_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let t = Timeouts::default();
            assert_eq!(t.action_ms, 10_000);
            assert_eq!(t.probe_ms, 2_000);
            assert_eq!(t.navigation_ms, 30_000);
            assert_eq!(t.poll_ms, 50);
        }

        #[test]
        fn test_probe_window_shorter_than_action_bound() {
            let t = Timeouts::default();
            assert!(t.probe().timeout() < t.action().timeout());
        }

        #[test]
        fn test_partial_yaml_keeps_defaults() {
            let t: Timeouts = serde_yaml_ng::from_str("probe_ms: 500").unwrap();
            assert_eq!(t.probe_ms, 500);
            assert_eq!(t.action_ms, DEFAULT_ACTION_TIMEOUT_MS);
        }
    }

    mod poll_tests {
        use super::*;

        #[tokio::test]
        async fn test_ready_on_first_probe() {
            let outcome: WaitOutcome<u8> =
                poll_until(WaitOptions::new(100, 5), || async { Ok::<_, ()>((true, 7)) })
                    .await
                    .unwrap();
            assert_eq!(outcome.ready(), Some(7));
        }

        #[tokio::test]
        async fn test_ready_after_several_polls() {
            let calls = AtomicUsize::new(0);
            let outcome = poll_until(WaitOptions::new(1_000, 1), || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, ()>((n >= 3, n)) }
            })
            .await
            .unwrap();
            assert!(outcome.is_ready());
            assert_eq!(calls.load(Ordering::SeqCst), 4);
        }

        #[tokio::test]
        async fn test_expired_keeps_last_observation() {
            let outcome = poll_until(WaitOptions::new(20, 5), || async {
                Ok::<_, ()>((false, "hidden"))
            })
            .await
            .unwrap();
            assert_eq!(outcome, WaitOutcome::Expired { last: Some("hidden") });
        }

        #[tokio::test]
        async fn test_zero_timeout_still_probes_once() {
            let calls = AtomicUsize::new(0);
            let outcome = poll_until(WaitOptions::new(0, 5), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, ()>((false, ())) }
            })
            .await
            .unwrap();
            assert!(!outcome.is_ready());
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn test_probe_error_aborts_wait() {
            let calls = AtomicUsize::new(0);
            let result: Result<WaitOutcome<()>, &str> = poll_until(WaitOptions::new(1_000, 1), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("context closed") }
            })
            .await;
            assert_eq!(result.unwrap_err(), "context closed");
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }
}
