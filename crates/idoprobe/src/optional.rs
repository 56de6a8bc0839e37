//! Steps that only happen sometimes.
//!
//! The application shows some UI only on the first pass through a flow (the
//! terms dialog, the share dialog) or only when state requires it (the
//! allowance approval). An [`OptionalStep`] waits a bounded window for its
//! trigger; if the trigger shows up it acts, otherwise it is a no-op.

use crate::locator::Locator;
use crate::page::Page;
use crate::result::ProbeResult;
use crate::wait::WaitOptions;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;

/// What an optional step did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Trigger appeared and the action ran
    Executed,
    /// Trigger never appeared
    Skipped,
}

impl StepOutcome {
    /// Whether the action ran
    #[must_use]
    pub const fn executed(self) -> bool {
        matches!(self, Self::Executed)
    }
}

/// Bounded existence check, then act or no-op
#[derive(Debug, Clone)]
pub struct OptionalStep {
    name: String,
    trigger: Locator,
    window: Option<WaitOptions>,
}

impl OptionalStep {
    /// Step named `name`, triggered by `trigger` becoming visible
    #[must_use]
    pub fn new(name: impl Into<String>, trigger: Locator) -> Self {
        Self {
            name: name.into(),
            trigger,
            window: None,
        }
    }

    /// Override the page's probe window
    #[must_use]
    pub const fn with_window(mut self, window: WaitOptions) -> Self {
        self.window = Some(window);
        self
    }

    /// Step name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element whose presence triggers the action
    #[must_use]
    pub const fn trigger(&self) -> &Locator {
        &self.trigger
    }

    /// Probe for the trigger and run `act` if it shows up.
    ///
    /// # Errors
    ///
    /// Driver failures while probing, and any error from `act`. Absence of
    /// the trigger is not an error.
    pub async fn run<F, Fut>(&self, page: &Page, act: F) -> ProbeResult<StepOutcome>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ProbeResult<()>> + Send,
    {
        let window = self.window.unwrap_or_else(|| page.timeouts().probe());
        let started = Instant::now();
        if page.probe_visible(&self.trigger, window).await? {
            tracing::info!(step = %self.name, trigger = %self.trigger, "optional step triggered");
            act().await?;
            Ok(StepOutcome::Executed)
        } else {
            tracing::debug!(
                step = %self.name,
                trigger = %self.trigger,
                waited_ms = started.elapsed().as_millis() as u64,
                "trigger absent, skipping"
            );
            Ok(StepOutcome::Skipped)
        }
    }
}
