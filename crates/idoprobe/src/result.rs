//! Result and error types for idoprobe.

use thiserror::Error;

/// Result type for idoprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving a purchase scenario.
///
/// Every variant is fatal for the enclosing scenario. Outcomes the
/// application is *expected* to show (a rejected signature, a disabled
/// purchase button) are asserted on, never raised as errors.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Wallet bootstrap failed (bad seed phrase, extension not installed)
    #[error("Wallet bootstrap failed: {message}")]
    Bootstrap {
        /// Error message
        message: String,
    },

    /// Network or token registration failed
    #[error("Wallet setup failed during {stage}: {message}")]
    Setup {
        /// Setup stage (add network, switch network, add token, ...)
        stage: String,
        /// Error message
        message: String,
    },

    /// A UI element never reached the required state
    #[error("Timed out after {ms}ms waiting for {locator} to be {state}")]
    InteractionTimeout {
        /// Description of the locator
        locator: String,
        /// State that was awaited
        state: String,
        /// Bound in milliseconds
        ms: u64,
    },

    /// A strict locator resolved to more than one element
    #[error("Strict mode violation: {locator} resolved to {count} elements")]
    StrictModeViolation {
        /// Description of the locator
        locator: String,
        /// Number of matches
        count: usize,
    },

    /// An assertion about the UI state failed
    #[error("Expected {locator} {expected}, but {actual}")]
    ValidationMismatch {
        /// Description of the locator
        locator: String,
        /// Expected condition
        expected: String,
        /// What was observed
        actual: String,
    },

    /// A scenario pipeline breaks the helper ordering contract
    #[error("Invalid pipeline at step {index} ({step}): {message}")]
    InvalidPipeline {
        /// Step position
        index: usize,
        /// Step name
        step: String,
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Wallet extension operation failed
    #[error("Wallet operation '{operation}' failed: {message}")]
    Wallet {
        /// Operation name
        operation: String,
        /// Error message
        message: String,
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

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create a bootstrap error
    #[must_use]
    pub fn bootstrap(message: impl Into<String>) -> Self {
        Self::Bootstrap {
            message: message.into(),
        }
    }

    /// Create a setup error for a named stage
    #[must_use]
    pub fn setup(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Setup {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
            message: message.into(),
        }
    }

    /// Create a wallet error
    #[must_use]
    pub fn wallet(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Wallet {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error happened before any scenario assertion could run
    #[must_use]
    pub const fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            Self::Bootstrap { .. } | Self::Setup { .. } | Self::BrowserLaunch { .. }
        )
    }

    /// Whether this error is a bounded wait that expired
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::InteractionTimeout { .. })
    }
}
