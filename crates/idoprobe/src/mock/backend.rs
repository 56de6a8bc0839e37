//! Simulated backend: pages, context and bootstrap over a [`SimulatedApp`].

use super::app::{SharedApp, SimulatedApp};
use super::dom::Dom;
use super::wallet::SimulatedWallet;
use crate::bootstrap::{Backend, BootstrapConfig, Bootstrapped, HARDHAT_MNEMONIC};
use crate::context::{BrowserContext, ContextDriver};
use crate::driver::{ElementState, PageDriver, Screenshot};
use crate::locator::Locator;
use crate::page::Page;
use crate::result::{ProbeError, ProbeResult};
use crate::wallet::WalletHandle;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// URL of the simulated extension's home page
pub const EXTENSION_HOME_URL: &str = "chrome-extension://simulated-wallet/home.html";

#[derive(Debug)]
struct PageState {
    app: SharedApp,
    url: Mutex<String>,
    history: Mutex<Vec<String>>,
    closed: AtomicBool,
    extension: bool,
}

/// One tab of the simulated browser
#[derive(Debug, Clone)]
pub struct SimulatedPage {
    state: Arc<PageState>,
}

impl SimulatedPage {
    /// Blank tab over a shared world
    #[must_use]
    pub fn new(app: SharedApp) -> Self {
        Self::with_url(app, "about:blank", false)
    }

    fn with_url(app: SharedApp, url: &str, extension: bool) -> Self {
        Self {
            state: Arc::new(PageState {
                app,
                url: Mutex::new(url.to_string()),
                history: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
                extension,
            }),
        }
    }

    /// Calls made through the driver, for verification
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state
            .history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.history().iter().any(|c| c.starts_with(method))
    }

    /// Whether the tab was closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        if let Ok(mut history) = self.state.history.lock() {
            history.push(call);
        }
    }

    fn ensure_open(&self) -> ProbeResult<()> {
        if self.is_closed() {
            return Err(ProbeError::page("target page, context or browser has been closed"));
        }
        Ok(())
    }

    fn current_url(&self) -> String {
        self.state
            .url
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }

    fn with_app<T>(&self, f: impl FnOnce(&mut SimulatedApp) -> ProbeResult<T>) -> ProbeResult<T> {
        let mut app = self
            .state
            .app
            .lock()
            .map_err(|_| ProbeError::page("simulated app lock poisoned"))?;
        f(&mut app)
    }

    fn document(&self) -> ProbeResult<Dom> {
        self.ensure_open()?;
        if self.state.extension {
            return Ok(Dom::empty());
        }
        let url = self.current_url();
        self.with_app(|app| {
            Ok(if app.serves(&url) {
                app.render()
            } else {
                Dom::empty()
            })
        })
    }

    fn target(&self, locator: &Locator) -> ProbeResult<Option<&'static str>> {
        let dom = self.document()?;
        let first = dom
            .resolve(locator)
            .first()
            .copied()
            .ok_or_else(|| ProbeError::page(format!("{locator} matched nothing")))?;
        Ok(dom.action(first))
    }
}

#[async_trait]
impl PageDriver for SimulatedPage {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        self.ensure_open()?;
        self.record(format!("goto:{url}"));
        if let Ok(mut current) = self.state.url.lock() {
            *current = url.to_string();
        }
        Ok(())
    }

    async fn url(&self) -> ProbeResult<String> {
        self.ensure_open()?;
        Ok(self.current_url())
    }

    async fn inspect(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>> {
        let dom = self.document()?;
        Ok(dom
            .resolve(locator)
            .into_iter()
            .map(|i| dom.state(i))
            .collect())
    }

    async fn click(&self, locator: &Locator) -> ProbeResult<()> {
        self.record(format!("click:{locator}"));
        match self.target(locator)? {
            Some(action) => self.with_app(|app| app.click(action)),
            None => Ok(()),
        }
    }

    async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()> {
        self.record(format!("fill:{locator}={value}"));
        let action = self
            .target(locator)?
            .ok_or_else(|| ProbeError::page(format!("{locator} is not editable")))?;
        self.with_app(|app| app.fill(action, value))
    }

    async fn bring_to_front(&self) -> ProbeResult<()> {
        self.ensure_open()?;
        self.record("bring_to_front".to_string());
        Ok(())
    }

    async fn screenshot(&self) -> ProbeResult<Screenshot> {
        self.ensure_open()?;
        Ok(Screenshot::new(Vec::new()))
    }

    async fn close(&self) -> ProbeResult<()> {
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Browser context of the simulated backend
#[derive(Debug, Clone)]
pub struct SimulatedContext {
    app: SharedApp,
    pages: Arc<Mutex<Vec<SimulatedPage>>>,
    closes: Arc<AtomicUsize>,
}

impl SimulatedContext {
    /// Context with the extension home page already open
    #[must_use]
    pub fn new(app: SharedApp) -> Self {
        let extension = SimulatedPage::with_url(app.clone(), EXTENSION_HOME_URL, true);
        Self {
            app,
            pages: Arc::new(Mutex::new(vec![extension])),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The world behind this context
    #[must_use]
    pub fn app(&self) -> SharedApp {
        self.app.clone()
    }

    /// How many times the context was torn down
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn extension_page(&self) -> Option<SimulatedPage> {
        self.pages.lock().ok().and_then(|p| p.first().cloned())
    }
}

#[async_trait]
impl ContextDriver for SimulatedContext {
    async fn new_page(&self) -> ProbeResult<Arc<dyn PageDriver>> {
        let page = SimulatedPage::new(self.app.clone());
        self.pages
            .lock()
            .map_err(|_| ProbeError::page("page list lock poisoned"))?
            .push(page.clone());
        Ok(Arc::new(page))
    }

    async fn pages(&self) -> ProbeResult<Vec<Arc<dyn PageDriver>>> {
        let pages = self
            .pages
            .lock()
            .map_err(|_| ProbeError::page("page list lock poisoned"))?;
        Ok(pages
            .iter()
            .filter(|p| !p.is_closed())
            .map(|p| Arc::new(p.clone()) as Arc<dyn PageDriver>)
            .collect())
    }

    async fn close(&self) -> ProbeResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if let Ok(pages) = self.pages.lock() {
            for page in pages.iter() {
                page.state.closed.store(true, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}

/// Backend that bootstraps simulated worlds.
///
/// Seeds listed as unfunded get an empty first account; every other seed's
/// first account holds [`super::app::FUNDED_BALANCE_TUSD`].
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    app_url: Option<String>,
    unfunded_seeds: Vec<String>,
    fail_install: bool,
    contexts: Arc<Mutex<Vec<SimulatedContext>>>,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self {
            app_url: None,
            unfunded_seeds: vec![HARDHAT_MNEMONIC.to_string()],
            fail_install: false,
            contexts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl SimulatedBackend {
    /// Backend with the default funding table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve the app at another URL
    #[must_use]
    pub fn with_app_url(mut self, url: impl Into<String>) -> Self {
        self.app_url = Some(url.into());
        self
    }

    /// Treat `seed` as holding no TUSD
    #[must_use]
    pub fn with_unfunded_seed(mut self, seed: impl Into<String>) -> Self {
        self.unfunded_seeds.push(seed.into());
        self
    }

    /// Make every extension install fail
    #[must_use]
    pub const fn with_failing_install(mut self) -> Self {
        self.fail_install = true;
        self
    }

    /// Contexts created so far
    #[must_use]
    pub fn contexts(&self) -> Vec<SimulatedContext> {
        self.contexts.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Backend for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn bootstrap(&self, config: &BootstrapConfig) -> ProbeResult<Bootstrapped> {
        if self.fail_install {
            return Err(ProbeError::bootstrap("wallet extension failed to install"));
        }
        let funded = !self
            .unfunded_seeds
            .iter()
            .any(|s| s.as_str() == config.seed.phrase());
        let mut app = SimulatedApp::new(funded);
        if let Some(url) = &self.app_url {
            app = app.with_app_url(url.clone());
        }
        let app = app.into_shared();

        let context_driver = SimulatedContext::new(app.clone());
        let extension = context_driver
            .extension_page()
            .ok_or_else(|| ProbeError::bootstrap("extension page missing"))?;
        if let Ok(mut contexts) = self.contexts.lock() {
            contexts.push(context_driver.clone());
        }

        let wallet = SimulatedWallet::new(app, config.timeouts.navigation());
        Ok(Bootstrapped {
            wallet: WalletHandle::new(Arc::new(wallet)),
            extension_page: Page::new(Arc::new(extension), config.timeouts),
            context: BrowserContext::new(Arc::new(context_driver), config.timeouts),
        })
    }
}
