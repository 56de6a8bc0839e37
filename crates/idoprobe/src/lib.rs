//! idoprobe: end-to-end purchase scenarios for a token-sale dApp.
//!
//! Scenarios drive the staging sale application through a real browser with
//! a MetaMask wallet, or through an in-process simulation of both.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────────────┐
//! │ Scenario     │    │ Helpers      │    │ Backend              │
//! │ (pipeline of │───►│ (page +      │───►│ Chromium + MetaMask  │
//! │  steps)      │    │  wallet)     │    │ or simulated app     │
//! └──────────────┘    └──────────────┘    └──────────────────────┘
//! ```
//!
//! ```no_run
//! use idoprobe::{catalog, mock::SimulatedBackend, ScenarioRunner, SuiteConfig};
//! use std::sync::Arc;
//!
//! # async fn demo() -> idoprobe::ProbeResult<()> {
//! let config = SuiteConfig::load(None)?;
//! let runner = ScenarioRunner::new(Arc::new(SimulatedBackend::new()), config);
//! let results = runner.run("purchase", &catalog()).await;
//! assert!(results.all_passed());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod assertion;
mod bootstrap;
mod browser;
mod chain;
mod config;
mod context;
mod driver;
mod harness;
pub mod helpers;
mod locator;
#[cfg(feature = "browser")]
mod metamask;
pub mod mock;
mod optional;
mod page;
mod pipeline;
mod quantity;
mod result;
mod scenario;
pub mod ui;
mod wait;
mod wallet;

pub use assertion::{is_whole_number, Expectation};
pub use bootstrap::{
    bootstrap_wallet, Backend, BootstrapConfig, Bootstrapped, SeedPhrase, HARDHAT_MNEMONIC, SEED_WORD_COUNTS,
};
pub use browser::{BrowserConfig, DEFAULT_WALLET_PASSWORD};
#[cfg(feature = "browser")]
pub use browser::{CdpContext, CdpPageDriver, ChromiumBackend};
pub use chain::{NetworkDefinition, TokenDefinition, MAX_SYMBOL_LEN};
pub use config::{
    StagingToggle, SuiteConfig, ENV_APP_URL, ENV_CHROMIUM_PATH, ENV_CI, ENV_EXTENSION_PATH, ENV_HEADLESS,
    ENV_WALLET_SEED,
};
pub use context::{BrowserContext, ContextDriver, ContextState};
pub use driver::{ElementState, PageDriver, Screenshot};
pub use harness::{ScenarioResult, ScenarioRunner, SuiteResults};
pub use locator::{normalize_whitespace, Locator, LocatorOptions, Selector, TextMatch, RESOLVER_PRELUDE};
#[cfg(feature = "browser")]
pub use metamask::MetaMaskWallet;
pub use optional::{OptionalStep, StepOutcome};
pub use page::Page;
pub use pipeline::{FlowState, Pipeline, RunReport, Session, Step, Target};
pub use quantity::Quantity;
pub use result::{ProbeError, ProbeResult};
pub use scenario::{catalog, select, Scenario, ScenarioFile, SeedOverride};
pub use wait::{
    poll_until, Timeouts, WaitOptions, WaitOutcome, DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_NAVIGATION_TIMEOUT_MS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_PROBE_TIMEOUT_MS,
};
pub use wallet::{Wallet, WalletHandle};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::helpers::{
        agree_if_prompted, configure_network, connect_wallet, dismiss_share_dialog_if_present, enable_staging_mode,
        ensure_connected, handle_approval_if_present, initiate_purchase,
    };
    pub use crate::{
        catalog, BrowserContext, Locator, Page, Pipeline, ProbeError, ProbeResult, Quantity, Scenario, ScenarioRunner,
        Step, SuiteConfig, Target, Timeouts, WalletHandle,
    };
}
