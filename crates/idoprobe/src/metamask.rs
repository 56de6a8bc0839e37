//! MetaMask driven through its own extension pages.
//!
//! Onboarding imports the seed on the extension's home page. Connection and
//! signature requests open `notification.html` popups, which the wallet finds
//! among the browser's tabs. Settings (networks, tokens, accounts) are driven
//! on the home page.
//!
//! Selectors are the extension's `data-testid`s where it has them and visible
//! labels elsewhere. They track the MetaMask 11 UI.

use crate::bootstrap::SeedPhrase;
use crate::browser::cdp::{open_pages, CdpPageDriver, SharedBrowser};
use crate::chain::{NetworkDefinition, TokenDefinition};
use crate::locator::Locator;
use crate::optional::OptionalStep;
use crate::page::Page;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{poll_until, Timeouts};
use crate::wallet::Wallet;
use async_trait::async_trait;
use std::sync::Arc;

mod selectors {
    pub const TERMS_CHECKBOX: &str = "onboarding-terms-checkbox";
    pub const IMPORT_WALLET: &str = "onboarding-import-wallet";
    pub const METRICS_DECLINE: &str = "metametrics-no-thanks";
    pub const SRP_CONFIRM: &str = "import-srp-confirm";
    pub const PASSWORD_NEW: &str = "create-password-new";
    pub const PASSWORD_CONFIRM: &str = "create-password-confirm";
    pub const PASSWORD_TERMS: &str = "create-password-terms";
    pub const PASSWORD_IMPORT: &str = "create-password-import";
    pub const ONBOARDING_DONE: &str = "onboarding-complete-done";
    pub const PIN_NEXT: &str = "pin-extension-next";
    pub const PIN_DONE: &str = "pin-extension-done";
    pub const NETWORK_DISPLAY: &str = "network-display";
    pub const ACCOUNT_MENU: &str = "account-menu-icon";
    pub const ACCOUNT_ITEM: &str = "account-list-item";
    pub const ADD_ACCOUNT: &str = "multichain-account-menu-popover-action-button";
    pub const IMPORT_TOKENS: &str = "import-token-button";

    pub fn srp_word(index: usize) -> String {
        format!("import-srp__srp-word-{index}")
    }
}

/// Extension id from a `chrome-extension://<id>/...` URL
#[must_use]
pub fn extension_id(url: &str) -> Option<&str> {
    url.strip_prefix("chrome-extension://")
        .and_then(|rest| rest.split('/').next())
        .filter(|id| !id.is_empty())
}

fn home_url(extension_id: &str, fragment: &str) -> String {
    format!("chrome-extension://{extension_id}/home.html#{fragment}")
}

/// Import `seed` through the onboarding pages and finish setup
///
/// # Errors
///
/// Any step of the onboarding flow failing or timing out
pub async fn onboard(page: &Page, extension_id: &str, seed: &SeedPhrase, password: &str) -> ProbeResult<()> {
    use selectors::*;

    tracing::info!(words = seed.word_count(), "importing seed into wallet");
    page.goto(&home_url(extension_id, "onboarding/welcome")).await?;
    page.check(&Locator::test_id(TERMS_CHECKBOX)).await?;
    page.click(&Locator::test_id(IMPORT_WALLET)).await?;
    page.click(&Locator::test_id(METRICS_DECLINE)).await?;

    for (i, word) in seed.words().enumerate() {
        page.fill(&Locator::test_id(srp_word(i)), word).await?;
    }
    page.click(&Locator::test_id(SRP_CONFIRM)).await?;

    page.fill(&Locator::test_id(PASSWORD_NEW), password).await?;
    page.fill(&Locator::test_id(PASSWORD_CONFIRM), password).await?;
    page.check(&Locator::test_id(PASSWORD_TERMS)).await?;
    page.click(&Locator::test_id(PASSWORD_IMPORT)).await?;

    page.click(&Locator::test_id(ONBOARDING_DONE)).await?;
    page.click(&Locator::test_id(PIN_NEXT)).await?;
    page.click(&Locator::test_id(PIN_DONE)).await?;
    Ok(())
}

/// MetaMask instance inside one launched browser
#[derive(Debug)]
pub struct MetaMaskWallet {
    browser: SharedBrowser,
    extension_id: String,
    home: Page,
    timeouts: Timeouts,
}

impl MetaMaskWallet {
    pub(crate) fn new(browser: SharedBrowser, extension_id: String, home: Page, timeouts: Timeouts) -> Self {
        Self {
            browser,
            extension_id,
            home,
            timeouts,
        }
    }

    /// Wait for a confirmation popup to open
    async fn popup(&self, operation: &str) -> ProbeResult<Page> {
        let marker = format!("chrome-extension://{}/notification.html", self.extension_id);
        let browser = &self.browser;
        let marker = marker.as_str();
        let outcome = poll_until(self.timeouts.navigation(), move || async move {
            let found = open_pages(browser)
                .await?
                .into_iter()
                .find(|(url, _)| url.starts_with(marker))
                .map(|(_, p)| p);
            Ok::<_, ProbeError>((found.is_some(), found))
        })
        .await?;
        match outcome.ready().flatten() {
            Some(page) => Ok(Page::new(Arc::new(CdpPageDriver::new(page)), self.timeouts)),
            None => Err(ProbeError::InteractionTimeout {
                locator: "MetaMask notification popup".to_string(),
                state: format!("open to {operation}"),
                ms: self.timeouts.navigation_ms,
            }),
        }
    }

    /// Click through any "Next" screens in front of the final button
    async fn skip_intermediate(&self, popup: &Page) -> ProbeResult<()> {
        let next = &Locator::button("Next").exact();
        OptionalStep::new("popup next", next.clone())
            .run(popup, move || async move { popup.click(next).await })
            .await?;
        Ok(())
    }

    async fn open_home(&self, fragment: &str) -> ProbeResult<()> {
        self.home.bring_to_front().await?;
        self.home.goto(&home_url(&self.extension_id, fragment)).await
    }
}

#[async_trait]
impl Wallet for MetaMaskWallet {
    fn name(&self) -> &str {
        "metamask"
    }

    async fn approve(&self) -> ProbeResult<()> {
        let popup = self.popup("approve the connection").await?;
        self.skip_intermediate(&popup).await?;
        popup.click(&Locator::button("Connect")).await
    }

    async fn sign(&self) -> ProbeResult<()> {
        let popup = self.popup("sign").await?;
        self.skip_intermediate(&popup).await?;
        let (popup, approve) = (&popup, &Locator::button("Approve").exact());
        let outcome = OptionalStep::new("spending cap", approve.clone())
            .run(popup, move || async move { popup.click(approve).await })
            .await?;
        if outcome.executed() {
            return Ok(());
        }
        popup.click(&Locator::button("Confirm").exact()).await
    }

    async fn reject(&self) -> ProbeResult<()> {
        let popup = self.popup("reject").await?;
        let (popup, reject) = (&popup, &Locator::button("Reject").exact());
        let outcome = OptionalStep::new("reject button", reject.clone())
            .run(popup, move || async move { popup.click(reject).await })
            .await?;
        if outcome.executed() {
            return Ok(());
        }
        popup.click(&Locator::button("Cancel").exact()).await
    }

    async fn add_network(&self, network: &NetworkDefinition) -> ProbeResult<()> {
        self.open_home("settings/networks/add-network").await?;
        let page = &self.home;
        page.fill(&Locator::label("Network name"), &network.name).await?;
        page.fill(&Locator::label("New RPC URL"), &network.rpc_url).await?;
        page.fill(&Locator::label("Chain ID"), &network.chain_id.to_string()).await?;
        page.fill(&Locator::label("Currency symbol"), &network.symbol).await?;
        page.click(&Locator::button("Save").exact()).await?;
        let switch = &Locator::button("Switch to");
        OptionalStep::new("switch prompt", switch.clone())
            .run(page, move || async move { page.click(switch).await })
            .await?;
        Ok(())
    }

    async fn switch_network(&self, name: &str) -> ProbeResult<()> {
        self.open_home("").await?;
        let page = &self.home;
        page.click(&Locator::test_id(selectors::NETWORK_DISPLAY)).await?;
        page.click(&Locator::text(name).exact().nth(0)).await
    }

    async fn add_token(&self, token: &TokenDefinition) -> ProbeResult<()> {
        self.open_home("").await?;
        let page = &self.home;
        page.click(&Locator::test_id(selectors::IMPORT_TOKENS)).await?;
        page.click(&Locator::button("Custom token")).await?;
        page.fill(&Locator::label("Token contract address"), &token.address).await?;
        page.fill(&Locator::label("Token symbol"), &token.symbol).await?;
        page.click(&Locator::button("Next").exact()).await?;
        page.click(&Locator::button("Import").exact()).await
    }

    async fn create_account(&self) -> ProbeResult<()> {
        self.open_home("").await?;
        let page = &self.home;
        page.click(&Locator::test_id(selectors::ACCOUNT_MENU)).await?;
        page.click(&Locator::test_id(selectors::ADD_ACCOUNT)).await?;
        page.click(&Locator::button("Add a new account")).await?;
        page.click(&Locator::button("Create").exact()).await
    }

    async fn switch_account(&self, index: usize) -> ProbeResult<()> {
        if index == 0 {
            return Err(ProbeError::wallet("switch account", "accounts are numbered from 1"));
        }
        self.open_home("").await?;
        let page = &self.home;
        page.click(&Locator::test_id(selectors::ACCOUNT_MENU)).await?;
        page.click(&Locator::test_id(selectors::ACCOUNT_ITEM).nth(index - 1)).await
    }
}
