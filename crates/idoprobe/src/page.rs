//! Auto-waiting page.
//!
//! Actions wait until their target is attached, unique, visible, enabled and
//! not covered by an overlay. Queries are immediate snapshots, except where
//! they need an element to read from.

use crate::assertion::Expectation;
use crate::driver::{ElementState, PageDriver, Screenshot};
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{poll_until, Timeouts, WaitOptions, WaitOutcome};
use std::fmt;
use std::sync::Arc;

/// A page of the application under test (or of the wallet extension)
#[derive(Clone)]
pub struct Page {
    driver: Arc<dyn PageDriver>,
    timeouts: Timeouts,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Wrap a driver
    #[must_use]
    pub fn new(driver: Arc<dyn PageDriver>, timeouts: Timeouts) -> Self {
        Self { driver, timeouts }
    }

    /// Timeout budget in use
    #[must_use]
    pub const fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn PageDriver> {
        &self.driver
    }

    /// Navigate within the navigation bound
    ///
    /// # Errors
    ///
    /// Returns `Navigation` if the driver fails or the bound expires
    pub async fn goto(&self, url: &str) -> ProbeResult<()> {
        tracing::debug!(url, "navigating");
        let bound = self.timeouts.navigation().timeout();
        match tokio::time::timeout(bound, self.driver.goto(url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ProbeError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(ProbeError::Navigation {
                url: url.to_string(),
                message: format!("no load event within {}ms", self.timeouts.navigation_ms),
            }),
        }
    }

    /// Current URL
    ///
    /// # Errors
    ///
    /// Returns error if the page is gone
    pub async fn url(&self) -> ProbeResult<String> {
        self.driver.url().await
    }

    /// Focus this tab
    ///
    /// # Errors
    ///
    /// Returns error if the page is gone
    pub async fn bring_to_front(&self) -> ProbeResult<()> {
        self.driver.bring_to_front().await
    }

    /// Capture the viewport
    ///
    /// # Errors
    ///
    /// Returns error if capture fails
    pub async fn screenshot(&self) -> ProbeResult<Screenshot> {
        self.driver.screenshot().await
    }

    /// Close this tab
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails to close
    pub async fn close(&self) -> ProbeResult<()> {
        self.driver.close().await
    }

    /// Wait options for actions on `locator`, honouring a per-locator override
    #[must_use]
    pub fn action_options(&self, locator: &Locator) -> WaitOptions {
        let base = self.timeouts.action();
        locator
            .options()
            .timeout_ms
            .map_or(base, |ms| base.with_timeout(ms))
    }

    /// Poll until the (unique) target satisfies `accept`.
    pub(crate) async fn wait_for<F>(
        &self,
        locator: &Locator,
        state: &str,
        options: WaitOptions,
        accept: F,
    ) -> ProbeResult<ElementState>
    where
        F: Fn(&ElementState) -> bool + Send + Sync,
    {
        let accept = &accept;
        let outcome = poll_until(options, move || async move {
            let first = self.resolve(locator).await?;
            let holds = first.as_ref().is_some_and(|s| accept(s));
            Ok::<_, ProbeError>((holds, first))
        })
        .await?;

        match outcome {
            WaitOutcome::Ready {
                value: Some(found), ..
            } => Ok(found),
            _ => Err(ProbeError::InteractionTimeout {
                locator: locator.to_string(),
                state: state.to_string(),
                ms: options.timeout_ms,
            }),
        }
    }

    /// Resolve to the first match, enforcing strict mode
    async fn resolve(&self, locator: &Locator) -> ProbeResult<Option<ElementState>> {
        let matches = self.driver.inspect(locator).await?;
        if locator.options().strict && matches.len() > 1 {
            return Err(ProbeError::StrictModeViolation {
                locator: locator.to_string(),
                count: matches.len(),
            });
        }
        Ok(matches.into_iter().next())
    }

    /// Click once the target is actionable
    ///
    /// # Errors
    ///
    /// `InteractionTimeout` if the target never becomes actionable,
    /// `StrictModeViolation` if it is ambiguous
    pub async fn click(&self, locator: &Locator) -> ProbeResult<()> {
        tracing::debug!(%locator, "click");
        self.wait_for(
            locator,
            "visible, enabled and unobscured",
            self.action_options(locator),
            ElementState::is_actionable,
        )
        .await?;
        self.driver.click(locator).await
    }

    /// Fill once the target is editable
    ///
    /// # Errors
    ///
    /// `InteractionTimeout` if the target never becomes editable
    pub async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()> {
        tracing::debug!(%locator, value, "fill");
        self.wait_for(
            locator,
            "editable",
            self.action_options(locator),
            ElementState::is_fillable,
        )
        .await?;
        self.driver.fill(locator, value).await
    }

    /// Check a checkbox; no-op if it is already checked
    ///
    /// # Errors
    ///
    /// `InteractionTimeout` if the checkbox never becomes actionable,
    /// `ValidationMismatch` if clicking did not check it
    pub async fn check(&self, locator: &Locator) -> ProbeResult<()> {
        tracing::debug!(%locator, "check");
        let state = self
            .wait_for(
                locator,
                "checkable",
                self.action_options(locator),
                ElementState::is_actionable,
            )
            .await?;
        if state.checked == Some(true) {
            return Ok(());
        }
        self.driver.click(locator).await?;
        self.expect(locator).to_be_checked().await
    }

    /// Whether the first match is visible right now
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails
    pub async fn is_visible(&self, locator: &Locator) -> ProbeResult<bool> {
        let matches = self.driver.inspect(locator).await?;
        Ok(matches.first().is_some_and(|s| s.visible))
    }

    /// Whether the target is enabled, once it is attached
    ///
    /// # Errors
    ///
    /// `InteractionTimeout` if nothing matches within the action bound
    pub async fn is_enabled(&self, locator: &Locator) -> ProbeResult<bool> {
        let state = self
            .wait_for(locator, "attached", self.action_options(locator), |_| true)
            .await?;
        Ok(state.enabled)
    }

    /// Current value of an input, once it is attached
    ///
    /// # Errors
    ///
    /// `InteractionTimeout` if nothing matches, `Page` if it is not an input
    pub async fn input_value(&self, locator: &Locator) -> ProbeResult<String> {
        let state = self
            .wait_for(locator, "attached", self.action_options(locator), |_| true)
            .await?;
        state
            .value
            .ok_or_else(|| ProbeError::page(format!("{locator} is not an input element")))
    }

    /// Text content of the target, once it is attached
    ///
    /// # Errors
    ///
    /// `InteractionTimeout` if nothing matches
    pub async fn text_content(&self, locator: &Locator) -> ProbeResult<String> {
        let state = self
            .wait_for(locator, "attached", self.action_options(locator), |_| true)
            .await?;
        Ok(state.text)
    }

    /// Number of matches right now
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails
    pub async fn count(&self, locator: &Locator) -> ProbeResult<usize> {
        Ok(self.driver.inspect(locator).await?.len())
    }

    /// Bounded existence check: does any match become visible within `window`?
    ///
    /// Never strict and never raises on absence.
    ///
    /// # Errors
    ///
    /// Only driver failures
    pub async fn probe_visible(&self, locator: &Locator, window: WaitOptions) -> ProbeResult<bool> {
        let outcome = poll_until(window, move || async move {
            let matches = self.driver.inspect(locator).await?;
            Ok::<_, ProbeError>((matches.iter().any(|s| s.visible), ()))
        })
        .await?;
        Ok(outcome.is_ready())
    }

    /// Retrying assertions on `locator`
    #[must_use]
    pub fn expect<'a>(&'a self, locator: &'a Locator) -> Expectation<'a> {
        Expectation::new(self, locator)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::{SimulatedApp, SimulatedPage};

    fn page_with(app: SimulatedApp) -> (Page, SimulatedPage) {
        let sim = SimulatedPage::new(app.into_shared());
        let page = Page::new(Arc::new(sim.clone()), Timeouts::fast());
        (page, sim)
    }

    async fn loaded_page() -> (Page, SimulatedPage) {
        let (page, sim) = page_with(SimulatedApp::default());
        page.goto("https://zerog-stg.netlify.app/").await.unwrap();
        (page, sim)
    }

    mod action_tests {
        use super::*;

        #[tokio::test]
        async fn test_click_missing_element_times_out_with_description() {
            let (page, _) = loaded_page().await;
            let err = page.click(&Locator::button("Does Not Exist")).await.unwrap_err();
            match err {
                ProbeError::InteractionTimeout { locator, state, ms } => {
                    assert!(locator.contains("Does Not Exist"));
                    assert!(state.contains("visible"));
                    assert_eq!(ms, Timeouts::fast().action_ms);
                }
                other => panic!("unexpected error {other}"),
            }
        }

        #[tokio::test]
        async fn test_per_locator_timeout_override() {
            let (page, _) = loaded_page().await;
            let err = page
                .click(&Locator::button("Nope").with_timeout(20))
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::InteractionTimeout { ms: 20, .. }));
        }

        #[tokio::test]
        async fn test_ambiguous_locator_is_strict_violation() {
            let (page, _) = loaded_page().await;
            let err = page
                .click(&Locator::role("navigation").child(Locator::role("button")))
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::StrictModeViolation { count, .. } if count > 1));
        }

        #[tokio::test]
        async fn test_check_is_idempotent() {
            let (page, _) = loaded_page().await;
            page.click(&Locator::role("navigation").child(Locator::role("button").nth(1)))
                .await
                .unwrap();
            let staging = Locator::role("checkbox");
            page.check(&staging).await.unwrap();
            page.check(&staging).await.unwrap();
            page.expect(&staging).to_be_checked().await.unwrap();
        }

        #[tokio::test]
        async fn test_goto_records_url() {
            let (page, _) = loaded_page().await;
            assert_eq!(page.url().await.unwrap(), "https://zerog-stg.netlify.app/");
        }
    }

    mod query_tests {
        use super::*;

        #[tokio::test]
        async fn test_is_visible_is_immediate() {
            let (page, _) = loaded_page().await;
            assert!(page.is_visible(&Locator::button("Connect Wallet")).await.unwrap());
            assert!(!page.is_visible(&Locator::button("Approve")).await.unwrap());
        }

        #[tokio::test]
        async fn test_probe_visible_absent_returns_false_within_window() {
            let (page, _) = loaded_page().await;
            let window = WaitOptions::new(30, 5);
            let start = std::time::Instant::now();
            let seen = page.probe_visible(&Locator::button("Approve"), window).await.unwrap();
            assert!(!seen);
            assert!(start.elapsed() >= std::time::Duration::from_millis(30));
        }

        #[tokio::test]
        async fn test_count_navigation_buttons() {
            let (page, _) = loaded_page().await;
            let nav_buttons = Locator::role("navigation").child(Locator::role("button"));
            assert!(page.count(&nav_buttons).await.unwrap() >= 3);
        }
    }
}
