//! Wallet bootstrap.
//!
//! Bootstrapping produces the three scenario-scoped resources together: an
//! unlocked wallet, the extension's own page, and the browser context that
//! has the extension installed. A [`Backend`] decides what those are
//! (a real Chromium with the extension loaded, or the in-process simulator).

use crate::browser::BrowserConfig;
use crate::context::BrowserContext;
use crate::page::Page;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::Timeouts;
use crate::wallet::WalletHandle;
use async_trait::async_trait;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// The well-known development mnemonic. Its accounts hold no TUSD on the
/// sale's chain, which makes it the canonical "empty wallet".
pub const HARDHAT_MNEMONIC: &str = "test test test test test test test test test test test junk";

/// Word counts a BIP-39 mnemonic may have
pub const SEED_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// A wallet recovery phrase. Never printed: `Debug` and `Serialize` redact it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct SeedPhrase(String);

impl SeedPhrase {
    /// Normalise and check a phrase
    ///
    /// # Errors
    ///
    /// `Bootstrap` if the word count is wrong or a word is not lowercase ASCII
    pub fn parse(raw: &str) -> ProbeResult<Self> {
        let words: Vec<String> = raw.split_whitespace().map(str::to_lowercase).collect();
        if !SEED_WORD_COUNTS.contains(&words.len()) {
            return Err(ProbeError::bootstrap(format!(
                "seed phrase must have 12, 15, 18, 21 or 24 words, got {}",
                words.len()
            )));
        }
        if let Some(pos) = words
            .iter()
            .position(|w| !w.bytes().all(|b| b.is_ascii_lowercase()))
        {
            return Err(ProbeError::bootstrap(format!(
                "seed phrase word {} is not a plain word",
                pos + 1
            )));
        }
        Ok(Self(words.join(" ")))
    }

    /// The phrase, space separated
    #[must_use]
    pub fn phrase(&self) -> &str {
        &self.0
    }

    /// Individual words
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ')
    }

    /// Number of words
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.words().count()
    }

    /// Redacted form for logs and reports
    #[must_use]
    pub fn redacted(&self) -> String {
        format!("<redacted: {} words>", self.word_count())
    }
}

impl fmt::Debug for SeedPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SeedPhrase").field(&self.redacted()).finish()
    }
}

impl Serialize for SeedPhrase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.redacted())
    }
}

impl TryFrom<String> for SeedPhrase {
    type Error = ProbeError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

/// Everything bootstrap needs, passed explicitly
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Recovery phrase imported into the wallet
    pub seed: SeedPhrase,
    /// Run the browser without a window
    pub headless: bool,
    /// Timeout budget for every page and wallet prompt
    pub timeouts: Timeouts,
    /// Browser launch settings
    pub browser: BrowserConfig,
}

impl BootstrapConfig {
    /// Config with defaults for everything but the seed
    #[must_use]
    pub fn new(seed: SeedPhrase) -> Self {
        Self {
            seed,
            headless: false,
            timeouts: Timeouts::default(),
            browser: BrowserConfig::default(),
        }
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the timeout budget
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set browser launch settings
    #[must_use]
    pub fn with_browser(mut self, browser: BrowserConfig) -> Self {
        self.browser = browser;
        self
    }
}

/// Result of a successful bootstrap
#[derive(Debug)]
pub struct Bootstrapped {
    /// Unlocked wallet bound to `context`
    pub wallet: WalletHandle,
    /// The extension's own page
    pub extension_page: Page,
    /// Context with the extension installed
    pub context: BrowserContext,
}

/// Source of bootstrapped wallets
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Create a context with the extension installed and the seed imported
    async fn bootstrap(&self, config: &BootstrapConfig) -> ProbeResult<Bootstrapped>;
}

/// Bootstrap a wallet. Failures are fatal and never retried.
///
/// # Errors
///
/// Always a setup-class error (`Bootstrap` unless the backend already
/// classified it)
pub async fn bootstrap_wallet(backend: &dyn Backend, config: &BootstrapConfig) -> ProbeResult<Bootstrapped> {
    tracing::info!(
        backend = backend.name(),
        headless = config.headless,
        seed = %config.seed.redacted(),
        "bootstrapping wallet"
    );
    backend.bootstrap(config).await.map_err(|e| {
        if e.is_setup_failure() {
            e
        } else {
            ProbeError::bootstrap(e.to_string())
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::SimulatedBackend;

    mod seed_tests {
        use super::*;

        #[test]
        fn test_hardhat_mnemonic_parses() {
            let seed = SeedPhrase::parse(HARDHAT_MNEMONIC).unwrap();
            assert_eq!(seed.word_count(), 12);
            assert_eq!(seed.phrase(), HARDHAT_MNEMONIC);
        }

        #[test]
        fn test_normalises_case_and_spacing() {
            let raw = "  TEST test\ttest test test test test test test test test   Junk ";
            assert_eq!(SeedPhrase::parse(raw).unwrap().phrase(), HARDHAT_MNEMONIC);
        }

        #[test]
        fn test_wrong_word_count() {
            let err = SeedPhrase::parse("test test test").unwrap_err();
            assert!(err.is_setup_failure());
            assert!(err.to_string().contains("got 3"));
        }

        #[test]
        fn test_non_word_rejected() {
            let raw = "test test test test test test test test test test test ju2k";
            assert!(SeedPhrase::parse(raw).unwrap_err().to_string().contains("word 12"));
        }

        #[test]
        fn test_debug_and_serialize_redact() {
            let seed = SeedPhrase::parse(HARDHAT_MNEMONIC).unwrap();
            let debug = format!("{seed:?}");
            assert!(!debug.contains("junk"));
            let json = serde_json::to_string(&seed).unwrap();
            assert_eq!(json, "\"<redacted: 12 words>\"");
        }

        #[test]
        fn test_deserialize_validates() {
            let ok: SeedPhrase = serde_yaml_ng::from_str(&format!("\"{HARDHAT_MNEMONIC}\"")).unwrap();
            assert_eq!(ok.word_count(), 12);
            assert!(serde_yaml_ng::from_str::<SeedPhrase>("\"one two\"").is_err());
        }
    }

    mod bootstrap_tests {
        use super::*;

        fn config() -> BootstrapConfig {
            BootstrapConfig::new(SeedPhrase::parse(HARDHAT_MNEMONIC).unwrap())
                .with_timeouts(Timeouts::fast())
                .with_headless(true)
        }

        #[tokio::test]
        async fn test_bootstrap_returns_open_context() {
            let boot = bootstrap_wallet(&SimulatedBackend::new(), &config()).await.unwrap();
            assert!(!boot.context.is_closed());
            assert_eq!(boot.wallet.active_account(), 1);
        }

        #[tokio::test]
        async fn test_install_failure_is_bootstrap_error() {
            let backend = SimulatedBackend::new().with_failing_install();
            let err = bootstrap_wallet(&backend, &config()).await.unwrap_err();
            assert!(matches!(err, ProbeError::Bootstrap { .. }));
        }
    }
}
