//! Retrying assertions on page elements.
//!
//! Each assertion polls until it holds or the action bound expires, then
//! reports what it last saw as a `ValidationMismatch`.

use crate::driver::ElementState;
use crate::locator::Locator;
use crate::page::Page;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{poll_until, WaitOptions, WaitOutcome};

/// Pending assertion on one locator
#[derive(Debug)]
pub struct Expectation<'a> {
    page: &'a Page,
    locator: &'a Locator,
    options: WaitOptions,
}

fn describe(state: Option<&ElementState>) -> String {
    match state {
        None => "no element matched".to_string(),
        Some(s) if !s.visible => "it is hidden".to_string(),
        Some(s) => {
            let mut parts = vec![if s.enabled { "enabled" } else { "disabled" }.to_string()];
            if let Some(v) = &s.value {
                parts.push(format!("value {v:?}"));
            }
            if let Some(c) = s.checked {
                parts.push(if c { "checked" } else { "unchecked" }.to_string());
            }
            if !s.text.is_empty() {
                parts.push(format!("text {:?}", s.text));
            }
            format!("it is {}", parts.join(", "))
        }
    }
}

/// Whether a field value parses to a whole number. "1", "+1" and "1.0"
/// are; "", "1.5", "abc" and "inf" are not.
#[must_use]
pub fn is_whole_number(value: &str) -> bool {
    value
        .trim()
        .parse::<f64>()
        .is_ok_and(|n| n.is_finite() && n.fract() == 0.0)
}

impl<'a> Expectation<'a> {
    pub(crate) fn new(page: &'a Page, locator: &'a Locator) -> Self {
        Self {
            page,
            locator,
            options: page.action_options(locator),
        }
    }

    /// Override the bound for this assertion
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.options = self.options.with_timeout(timeout_ms);
        self
    }

    async fn holds<F>(&self, expected: &str, check: F) -> ProbeResult<()>
    where
        F: Fn(Option<&ElementState>) -> bool + Send + Sync,
    {
        let driver = self.page.driver();
        let locator = self.locator;
        let check = &check;
        let outcome = poll_until(self.options, move || async move {
            let matches = driver.inspect(locator).await?;
            if locator.options().strict && matches.len() > 1 {
                return Err(ProbeError::StrictModeViolation {
                    locator: locator.to_string(),
                    count: matches.len(),
                });
            }
            let first = matches.into_iter().next();
            Ok::<_, ProbeError>((check(first.as_ref()), first))
        })
        .await?;

        match outcome {
            WaitOutcome::Ready { .. } => Ok(()),
            WaitOutcome::Expired { last } => Err(ProbeError::ValidationMismatch {
                locator: self.locator.to_string(),
                expected: expected.to_string(),
                actual: describe(last.flatten().as_ref()),
            }),
        }
    }

    /// Element is visible
    ///
    /// # Errors
    ///
    /// `ValidationMismatch` if it never becomes visible
    pub async fn to_be_visible(self) -> ProbeResult<()> {
        self.holds("to be visible", |s| s.is_some_and(|s| s.visible))
            .await
    }

    /// Element is absent or hidden
    ///
    /// # Errors
    ///
    /// `ValidationMismatch` if it stays visible
    pub async fn to_be_hidden(self) -> ProbeResult<()> {
        self.holds("to be hidden", |s| !s.is_some_and(|s| s.visible))
            .await
    }

    /// Element is enabled
    ///
    /// # Errors
    ///
    /// `ValidationMismatch` if it never becomes enabled
    pub async fn to_be_enabled(self) -> ProbeResult<()> {
        self.holds("to be enabled", |s| s.is_some_and(|s| s.enabled))
            .await
    }

    /// Element is attached and disabled
    ///
    /// # Errors
    ///
    /// `ValidationMismatch` if it is missing or stays enabled
    pub async fn to_be_disabled(self) -> ProbeResult<()> {
        self.holds("to be disabled", |s| s.is_some_and(|s| !s.enabled))
            .await
    }

    /// Checkbox is checked
    ///
    /// # Errors
    ///
    /// `ValidationMismatch` if it never becomes checked
    pub async fn to_be_checked(self) -> ProbeResult<()> {
        self.holds("to be checked", |s| s.is_some_and(|s| s.checked == Some(true)))
            .await
    }

    /// Input value equals `expected`
    ///
    /// # Errors
    ///
    /// `ValidationMismatch` if the value never matches
    pub async fn to_have_value(self, expected: &str) -> ProbeResult<()> {
        let description = format!("to have value {expected:?}");
        self.holds(&description, |s| {
            s.and_then(|s| s.value.as_deref()) == Some(expected)
        })
        .await
    }

    /// Input value parses as a whole number
    ///
    /// # Errors
    ///
    /// `ValidationMismatch` if the value is empty, fractional or not numeric
    pub async fn to_have_whole_number_value(self) -> ProbeResult<()> {
        self.holds("to have a whole-number value", |s| {
            s.and_then(|s| s.value.as_deref()).is_some_and(is_whole_number)
        })
        .await
    }

    /// Text content contains `expected` (case-insensitive)
    ///
    /// # Errors
    ///
    /// `ValidationMismatch` if the text never matches
    pub async fn to_contain_text(self, expected: &str) -> ProbeResult<()> {
        let description = format!("to contain text {expected:?}");
        let needle = expected.to_lowercase();
        self.holds(&description, |s| {
            s.is_some_and(|s| s.text.to_lowercase().contains(&needle))
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::{SimulatedApp, SimulatedPage};
    use crate::wait::Timeouts;
    use std::sync::Arc;

    async fn page() -> Page {
        let sim = SimulatedPage::new(SimulatedApp::default().into_shared());
        let page = Page::new(Arc::new(sim), Timeouts::fast());
        page.goto("https://zerog-stg.netlify.app/").await.unwrap();
        page
    }

    mod whole_number_tests {
        use super::*;

        #[test]
        fn test_whole_numbers() {
            assert!(is_whole_number("1"));
            assert!(is_whole_number("-3"));
            assert!(is_whole_number(" 42 "));
            assert!(is_whole_number("1.0"));
            assert!(is_whole_number("+1"));
            assert!(is_whole_number("-0"));
        }

        #[test]
        fn test_not_whole_numbers() {
            assert!(!is_whole_number(""));
            assert!(!is_whole_number("1.5"));
            assert!(!is_whole_number("abc"));
            assert!(!is_whole_number("-"));
            assert!(!is_whole_number("inf"));
            assert!(!is_whole_number("NaN"));
            assert!(!is_whole_number("1.000001"));
        }
    }

    mod expectation_tests {
        use super::*;

        #[tokio::test]
        async fn test_visible_passes() {
            let page = page().await;
            let loc = Locator::button("Connect Wallet");
            page.expect(&loc).to_be_visible().await.unwrap();
        }

        #[tokio::test]
        async fn test_hidden_passes_for_absent_element() {
            let page = page().await;
            let loc = Locator::text("Confirm Purchase");
            page.expect(&loc).to_be_hidden().await.unwrap();
        }

        #[tokio::test]
        async fn test_mismatch_reports_observation() {
            let page = page().await;
            let loc = Locator::button("Connect Wallet");
            let err = page
                .expect(&loc)
                .with_timeout(20)
                .to_be_disabled()
                .await
                .unwrap_err();
            match err {
                ProbeError::ValidationMismatch {
                    expected, actual, ..
                } => {
                    assert_eq!(expected, "to be disabled");
                    assert!(actual.contains("enabled"));
                }
                other => panic!("unexpected error {other}"),
            }
        }

        #[tokio::test]
        async fn test_missing_element_mismatch() {
            let page = page().await;
            let loc = Locator::button("Ghost");
            let err = page
                .expect(&loc)
                .with_timeout(10)
                .to_be_visible()
                .await
                .unwrap_err();
            assert!(err.to_string().contains("no element matched"));
        }
    }
}
