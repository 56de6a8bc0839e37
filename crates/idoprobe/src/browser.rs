//! Browser control over the Chrome `DevTools` Protocol.
//!
//! With the `browser` feature this module provides [`ChromiumBackend`]: every
//! bootstrap launches a Chromium with the wallet extension loaded into a fresh
//! temporary profile, imports the seed through the extension's onboarding
//! pages, and hands back the extension page, a MetaMask-driving wallet and the
//! browser as a [`crate::BrowserContext`].
//!
//! Without the feature only [`BrowserConfig`] is available and scenarios run
//! against [`crate::mock::SimulatedBackend`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Password the onboarding flow sets on the imported wallet
pub const DEFAULT_WALLET_PASSWORD: &str = "Tester@1234";

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<PathBuf>,
    /// Unpacked wallet extension directory
    pub extension_path: Option<PathBuf>,
    /// Password set during wallet onboarding
    pub wallet_password: String,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            extension_path: None,
            wallet_password: DEFAULT_WALLET_PASSWORD.to_string(),
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set the unpacked extension directory
    #[must_use]
    pub fn with_extension_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.extension_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
#[allow(clippy::significant_drop_tightening, clippy::missing_errors_doc)]
pub(crate) mod cdp {
    use super::BrowserConfig;
    use crate::bootstrap::{Backend, BootstrapConfig, Bootstrapped};
    use crate::context::{BrowserContext, ContextDriver};
    use crate::driver::{ElementState, PageDriver, Screenshot};
    use crate::locator::{Locator, RESOLVER_PRELUDE};
    use crate::metamask::{self, MetaMaskWallet};
    use crate::page::Page;
    use crate::result::{ProbeError, ProbeResult};
    use crate::wait::poll_until;
    use crate::wallet::WalletHandle;
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
    use chromiumoxide::cdp::browser_protocol::page::{
        BringToFrontParams, CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use chromiumoxide::layout::Point;
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    pub(crate) type SharedBrowser = Arc<Mutex<CdpBrowser>>;

    fn page_error(e: impl std::fmt::Display) -> ProbeError {
        ProbeError::page(e.to_string())
    }

    fn launch_error(e: impl std::fmt::Display) -> ProbeError {
        ProbeError::BrowserLaunch {
            message: e.to_string(),
        }
    }

    /// A browser tab driven over CDP
    #[derive(Debug, Clone)]
    pub struct CdpPageDriver {
        inner: Arc<Mutex<CdpPage>>,
    }

    impl CdpPageDriver {
        pub(crate) fn new(page: CdpPage) -> Self {
            Self {
                inner: Arc::new(Mutex::new(page)),
            }
        }

        async fn eval<T: DeserializeOwned>(&self, body: &str) -> ProbeResult<T> {
            let script = format!("(() => {{{RESOLVER_PRELUDE}\n{body}\n}})()");
            let page = self.inner.lock().await;
            page.evaluate(script)
                .await
                .map_err(page_error)?
                .into_value::<T>()
                .map_err(page_error)
        }
    }

    #[async_trait]
    impl PageDriver for CdpPageDriver {
        async fn goto(&self, url: &str) -> ProbeResult<()> {
            let page = self.inner.lock().await;
            page.goto(url).await.map_err(|e| ProbeError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            Ok(())
        }

        async fn url(&self) -> ProbeResult<String> {
            let page = self.inner.lock().await;
            Ok(page.url().await.map_err(page_error)?.unwrap_or_default())
        }

        async fn inspect(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>> {
            self.eval(&format!("return ({}).map(el => __ip.state(el));", locator.to_query()))
                .await
        }

        async fn click(&self, locator: &Locator) -> ProbeResult<()> {
            let center: Option<(f64, f64)> = self
                .eval(&format!(
                    "const el = ({})[0];
                     if (!el) return null;
                     el.scrollIntoView({{ block: 'center', inline: 'center' }});
                     const r = el.getBoundingClientRect();
                     return [r.left + r.width / 2, r.top + r.height / 2];",
                    locator.to_query()
                ))
                .await?;
            let (x, y) = center.ok_or_else(|| page_error(format!("{locator} matched nothing")))?;
            let page = self.inner.lock().await;
            page.click(Point::new(x, y)).await.map_err(page_error)?;
            Ok(())
        }

        async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()> {
            let focused: bool = self
                .eval(&format!(
                    "const el = ({})[0];
                     if (!el) return false;
                     el.focus();
                     if (typeof el.select === 'function') el.select();
                     return true;",
                    locator.to_query()
                ))
                .await?;
            if !focused {
                return Err(page_error(format!("{locator} matched nothing")));
            }
            if value.is_empty() {
                let _: bool = self.eval("return document.execCommand('delete');").await?;
                return Ok(());
            }
            let page = self.inner.lock().await;
            page.execute(InsertTextParams::new(value))
                .await
                .map_err(page_error)?;
            Ok(())
        }

        async fn bring_to_front(&self) -> ProbeResult<()> {
            let page = self.inner.lock().await;
            page.execute(BringToFrontParams::default())
                .await
                .map_err(page_error)?;
            Ok(())
        }

        async fn screenshot(&self) -> ProbeResult<Screenshot> {
            let page = self.inner.lock().await;
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();
            let shot = page.execute(params).await.map_err(page_error)?;

            use base64::Engine;
            let data = base64::engine::general_purpose::STANDARD
                .decode(&shot.data)
                .map_err(page_error)?;
            Ok(Screenshot::new(data))
        }

        async fn close(&self) -> ProbeResult<()> {
            let page = self.inner.lock().await.clone();
            page.close().await.map_err(page_error)
        }
    }

    /// All open tabs of `browser`, with their URLs
    pub(crate) async fn open_pages(browser: &SharedBrowser) -> ProbeResult<Vec<(String, CdpPage)>> {
        let pages = browser.lock().await.pages().await.map_err(page_error)?;
        let mut out = Vec::with_capacity(pages.len());
        for page in pages {
            let url = page.url().await.map_err(page_error)?.unwrap_or_default();
            out.push((url, page));
        }
        Ok(out)
    }

    /// One launched browser with its own profile; closing it ends the scenario
    #[derive(Debug)]
    pub struct CdpContext {
        browser: SharedBrowser,
        handler: tokio::task::JoinHandle<()>,
        profile: std::sync::Mutex<Option<tempfile::TempDir>>,
    }

    #[async_trait]
    impl ContextDriver for CdpContext {
        async fn new_page(&self) -> ProbeResult<Arc<dyn PageDriver>> {
            let page = self
                .browser
                .lock()
                .await
                .new_page("about:blank")
                .await
                .map_err(page_error)?;
            Ok(Arc::new(CdpPageDriver::new(page)))
        }

        async fn pages(&self) -> ProbeResult<Vec<Arc<dyn PageDriver>>> {
            Ok(open_pages(&self.browser)
                .await?
                .into_iter()
                .map(|(_, p)| Arc::new(CdpPageDriver::new(p)) as Arc<dyn PageDriver>)
                .collect())
        }

        async fn close(&self) -> ProbeResult<()> {
            let result = {
                let mut browser = self.browser.lock().await;
                match browser.close().await {
                    Ok(_) => browser.wait().await.map(|_| ()).map_err(page_error),
                    Err(e) => Err(page_error(e)),
                }
            };
            self.handler.abort();
            if let Ok(mut profile) = self.profile.lock() {
                profile.take();
            }
            result
        }
    }

    /// Launches Chromium with the wallet extension for every bootstrap
    #[derive(Debug, Clone, Default)]
    pub struct ChromiumBackend;

    impl ChromiumBackend {
        /// Create a backend
        #[must_use]
        pub const fn new() -> Self {
            Self
        }

        fn launch_config(config: &BootstrapConfig, profile: &std::path::Path) -> ProbeResult<CdpConfig> {
            let browser: &BrowserConfig = &config.browser;
            let extension = browser.extension_path.as_ref().ok_or_else(|| {
                ProbeError::bootstrap("no wallet extension configured; set IDOPROBE_EXTENSION_PATH")
            })?;
            if !extension.join("manifest.json").is_file() {
                return Err(ProbeError::bootstrap(format!(
                    "{} is not an unpacked extension",
                    extension.display()
                )));
            }
            let extension = extension.display().to_string();

            let mut builder = CdpConfig::builder()
                .user_data_dir(profile)
                .window_size(browser.viewport_width, browser.viewport_height)
                .extension(extension.clone())
                .arg(format!("--disable-extensions-except={extension}"));
            builder = if config.headless {
                builder.new_headless_mode()
            } else {
                builder.with_head()
            };
            if !browser.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(path) = &browser.chromium_path {
                builder = builder.chrome_executable(path);
            }
            builder.build().map_err(launch_error)
        }
    }

    #[async_trait]
    impl Backend for ChromiumBackend {
        fn name(&self) -> &str {
            "chromium"
        }

        async fn bootstrap(&self, config: &BootstrapConfig) -> ProbeResult<Bootstrapped> {
            let profile = tempfile::tempdir()
                .map_err(|e| ProbeError::bootstrap(format!("profile directory: {e}")))?;
            let cdp_config = Self::launch_config(config, profile.path())?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(launch_error)?;
            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });
            let browser: SharedBrowser = Arc::new(Mutex::new(browser));
            let context = BrowserContext::new(
                Arc::new(CdpContext {
                    browser: browser.clone(),
                    handler: handle,
                    profile: std::sync::Mutex::new(Some(profile)),
                }),
                config.timeouts,
            );

            let found = poll_until(config.timeouts.navigation(), || {
                let browser = browser.clone();
                async move {
                    let home = open_pages(&browser)
                        .await?
                        .into_iter()
                        .find(|(url, _)| url.starts_with("chrome-extension://"));
                    Ok::<_, ProbeError>((home.is_some(), home))
                }
            })
            .await;
            let (url, home) = match found {
                Ok(outcome) => match outcome.ready().flatten() {
                    Some(found) => found,
                    None => {
                        return Err(context
                            .abandon(ProbeError::bootstrap("wallet extension never opened its home page"))
                            .await);
                    }
                },
                Err(e) => return Err(context.abandon(ProbeError::bootstrap(e.to_string())).await),
            };
            let Some(extension_id) = metamask::extension_id(&url).map(str::to_string) else {
                return Err(context
                    .abandon(ProbeError::bootstrap(format!("unexpected extension URL {url}")))
                    .await);
            };
            tracing::debug!(%extension_id, "wallet extension loaded");

            let extension_page = Page::new(Arc::new(CdpPageDriver::new(home)), config.timeouts);
            if let Err(e) = metamask::onboard(
                &extension_page,
                &extension_id,
                &config.seed,
                &config.browser.wallet_password,
            )
            .await
            {
                return Err(context
                    .abandon(ProbeError::bootstrap(format!("wallet onboarding failed: {e}")))
                    .await);
            }

            let wallet = MetaMaskWallet::new(browser, extension_id, extension_page.clone(), config.timeouts);
            Ok(Bootstrapped {
                wallet: WalletHandle::new(Arc::new(wallet)),
                extension_page,
                context,
            })
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{CdpContext, CdpPageDriver, ChromiumBackend};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrowserConfig::default();
        assert_eq!(config.viewport_width, 1280);
        assert!(config.sandbox);
        assert!(config.extension_path.is_none());
        assert_eq!(config.wallet_password, DEFAULT_WALLET_PASSWORD);
    }

    #[test]
    fn test_builders() {
        let config = BrowserConfig::default()
            .with_viewport(800, 600)
            .with_no_sandbox()
            .with_chromium_path("/usr/bin/chromium")
            .with_extension_path("/opt/metamask");
        assert_eq!((config.viewport_width, config.viewport_height), (800, 600));
        assert!(!config.sandbox);
        assert_eq!(config.extension_path.unwrap(), PathBuf::from("/opt/metamask"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: BrowserConfig = serde_yaml_ng::from_str("sandbox: false\n").unwrap();
        assert!(!config.sandbox);
        assert_eq!(config.viewport_height, 800);
    }

    #[cfg(feature = "browser")]
    #[tokio::test]
    async fn test_bootstrap_without_extension_is_setup_failure() {
        use crate::bootstrap::{Backend, BootstrapConfig, SeedPhrase, HARDHAT_MNEMONIC};
        let config = BootstrapConfig::new(SeedPhrase::parse(HARDHAT_MNEMONIC).unwrap());
        let err = ChromiumBackend::new().bootstrap(&config).await.unwrap_err();
        assert!(err.is_setup_failure());
    }
}
