//! Browser context management.
//!
//! A [`BrowserContext`] is the isolation unit of a scenario: it owns the
//! browser profile with the wallet extension installed, the application tab
//! and any extension popups. Exactly one exists per scenario and it is closed
//! when the scenario ends, whatever the outcome.

use crate::driver::PageDriver;
use crate::page::Page;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::Timeouts;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Browser context state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextState {
    /// Context is ready for use
    Ready,
    /// Context is being torn down
    Closing,
    /// Context is closed
    Closed,
}

/// Backend-specific half of a context
#[async_trait]
pub trait ContextDriver: Send + Sync {
    /// Open a new blank tab
    async fn new_page(&self) -> ProbeResult<Arc<dyn PageDriver>>;

    /// Every open tab, including extension pages
    async fn pages(&self) -> ProbeResult<Vec<Arc<dyn PageDriver>>>;

    /// Tear down the context and everything it owns
    async fn close(&self) -> ProbeResult<()>;
}

/// A browser context instance
pub struct BrowserContext {
    /// Context ID
    pub id: String,
    /// Creation time
    pub created_at: Instant,
    driver: Arc<dyn ContextDriver>,
    timeouts: Timeouts,
    state: Mutex<ContextState>,
}

impl fmt::Debug for BrowserContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserContext")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl BrowserContext {
    /// Wrap a backend context
    #[must_use]
    pub fn new(driver: Arc<dyn ContextDriver>, timeouts: Timeouts) -> Self {
        Self {
            id: format!("ctx_{}", uuid::Uuid::new_v4()),
            created_at: Instant::now(),
            driver,
            timeouts,
            state: Mutex::new(ContextState::Ready),
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ContextState {
        self.state.lock().map_or(ContextState::Closed, |s| *s)
    }

    /// Check if context is closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() != ContextState::Ready
    }

    /// Timeout budget handed to every page of this context
    #[must_use]
    pub const fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Get age in milliseconds
    #[must_use]
    pub fn age_ms(&self) -> u64 {
        self.created_at.elapsed().as_millis() as u64
    }

    fn ensure_open(&self) -> ProbeResult<()> {
        if self.is_closed() {
            return Err(ProbeError::page(format!("context {} is closed", self.id)));
        }
        Ok(())
    }

    /// Open a new tab
    ///
    /// # Errors
    ///
    /// Returns error if the context is closed or the backend fails
    pub async fn new_page(&self) -> ProbeResult<Page> {
        self.ensure_open()?;
        let driver = self.driver.new_page().await?;
        Ok(Page::new(driver, self.timeouts))
    }

    /// Every open tab
    ///
    /// # Errors
    ///
    /// Returns error if the context is closed or the backend fails
    pub async fn pages(&self) -> ProbeResult<Vec<Page>> {
        self.ensure_open()?;
        Ok(self
            .driver
            .pages()
            .await?
            .into_iter()
            .map(|d| Page::new(d, self.timeouts))
            .collect())
    }

    /// First tab whose URL contains `fragment`
    ///
    /// # Errors
    ///
    /// Returns error if the context is closed or the backend fails
    pub async fn find_page(&self, fragment: &str) -> ProbeResult<Option<Page>> {
        for page in self.pages().await? {
            if page.url().await?.contains(fragment) {
                return Ok(Some(page));
            }
        }
        Ok(None)
    }

    /// Close the context. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails to tear down
    pub async fn close(&self) -> ProbeResult<()> {
        {
            let Ok(mut state) = self.state.lock() else {
                return Ok(());
            };
            if *state != ContextState::Ready {
                return Ok(());
            }
            *state = ContextState::Closing;
        }
        tracing::debug!(context = %self.id, age_ms = self.age_ms(), "closing context");
        let result = self.driver.close().await;
        if let Ok(mut state) = self.state.lock() {
            *state = ContextState::Closed;
        }
        result
    }

    /// Close the context after a failed setup and hand back `error`.
    /// A teardown failure is logged; `error` stays the one reported.
    pub async fn abandon(&self, error: ProbeError) -> ProbeError {
        if let Err(e) = self.close().await {
            tracing::warn!(context = %self.id, error = %e, "context teardown failed");
        }
        error
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::{SimulatedApp, SimulatedContext};

    fn context() -> (BrowserContext, SimulatedContext) {
        let sim = SimulatedContext::new(SimulatedApp::default().into_shared());
        let ctx = BrowserContext::new(Arc::new(sim.clone()), Timeouts::fast());
        (ctx, sim)
    }

    #[tokio::test]
    async fn test_new_context_is_ready() {
        let (ctx, _) = context();
        assert_eq!(ctx.state(), ContextState::Ready);
        assert!(ctx.id.starts_with("ctx_"));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (ctx, sim) = context();
        ctx.close().await.unwrap();
        ctx.close().await.unwrap();
        assert!(ctx.is_closed());
        assert_eq!(sim.close_count(), 1);
    }

    #[tokio::test]
    async fn test_new_page_after_close_fails() {
        let (ctx, _) = context();
        ctx.close().await.unwrap();
        assert!(ctx.new_page().await.is_err());
    }

    #[tokio::test]
    async fn test_find_page_by_url_fragment() {
        let (ctx, _) = context();
        let page = ctx.new_page().await.unwrap();
        page.goto("https://zerog-stg.netlify.app/").await.unwrap();
        assert!(ctx.find_page("zerog-stg").await.unwrap().is_some());
        assert!(ctx.find_page("nowhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_abandon_closes_and_keeps_error() {
        let (ctx, sim) = context();
        let err = ctx.abandon(ProbeError::bootstrap("unexpected extension URL about:blank")).await;
        assert!(matches!(err, ProbeError::Bootstrap { .. }));
        assert!(err.to_string().contains("about:blank"));
        assert!(ctx.is_closed());
        assert_eq!(sim.close_count(), 1);
    }

    #[test]
    fn test_unique_ids() {
        let (a, _) = context();
        let (b, _) = context();
        assert_ne!(a.id, b.id);
    }
}
