//! Suite configuration.
//!
//! Everything a run needs is gathered into one [`SuiteConfig`] at the edge
//! of the program and passed down explicitly. Sources, lowest priority first:
//!
//! 1. built-in defaults
//! 2. a YAML file
//! 3. a `.env` file in the working directory, then the process environment
//! 4. command-line flags (applied by the CLI)

use crate::bootstrap::{BootstrapConfig, SeedPhrase};
use crate::browser::BrowserConfig;
use crate::chain::{NetworkDefinition, TokenDefinition};
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use crate::ui;
use crate::wait::Timeouts;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Seed phrase
pub const ENV_WALLET_SEED: &str = "WALLET_SEED";
/// Set by CI providers; any value but `0`/`false` forces headless
pub const ENV_CI: &str = "CI";
/// Application URL override
pub const ENV_APP_URL: &str = "IDOPROBE_APP_URL";
/// Headless override (`true`/`false`/`1`/`0`)
pub const ENV_HEADLESS: &str = "IDOPROBE_HEADLESS";
/// Unpacked wallet extension directory
pub const ENV_EXTENSION_PATH: &str = "IDOPROBE_EXTENSION_PATH";
/// Chromium binary
pub const ENV_CHROMIUM_PATH: &str = "CHROMIUM_PATH";

/// How to reach the control that reveals the staging checkbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum StagingToggle {
    /// n-th button (zero-based) of the navigation region
    Position {
        /// Button index
        index: usize,
    },
    /// Button of the navigation region with this role and accessible name
    Named {
        /// ARIA role
        role: String,
        /// Accessible name
        name: String,
    },
}

impl Default for StagingToggle {
    fn default() -> Self {
        Self::Position { index: 1 }
    }
}

impl StagingToggle {
    /// Locator of the control that opens the staging menu
    #[must_use]
    pub fn opener(&self) -> Locator {
        match self {
            Self::Position { index } => ui::navigation().child(Locator::role("button")).nth(*index),
            Self::Named { role, name } => {
                ui::navigation().child(Locator::role(role.clone()).with_name(name.clone()))
            }
        }
    }

    /// Locator of the staging checkbox
    #[must_use]
    pub fn checkbox(&self) -> Locator {
        Locator::role("checkbox")
    }
}

/// Effective configuration of a suite run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Application under test
    pub app_url: String,
    /// Seed phrase imported into every bootstrapped wallet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<SeedPhrase>,
    /// Run the browser without a window
    pub headless: bool,
    /// Timeout budget
    pub timeouts: Timeouts,
    /// Network the wallet is configured for
    pub network: NetworkDefinition,
    /// Token imported after switching network
    pub token: TokenDefinition,
    /// Staging precondition control
    pub staging_toggle: StagingToggle,
    /// Browser launch settings
    pub browser: BrowserConfig,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            app_url: ui::APP_URL.to_string(),
            seed: None,
            headless: false,
            timeouts: Timeouts::default(),
            network: NetworkDefinition::arbitrum_sepolia(),
            token: TokenDefinition::tusd(),
            staging_toggle: StagingToggle::default(),
            browser: BrowserConfig::default(),
        }
    }
}

fn parse_flag(name: &str, raw: &str) -> ProbeResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ProbeError::config(format!("{name}: expected a boolean, got '{other}'"))),
    }
}

impl SuiteConfig {
    /// Parse YAML; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns `Yaml` for malformed documents or an invalid seed
    pub fn from_yaml_str(yaml: &str) -> ProbeResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Read a YAML file
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `Yaml` if it does not parse
    pub fn from_file(path: &Path) -> ProbeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Defaults or `path`, then `.env`, then the process environment
    ///
    /// # Errors
    ///
    /// File, parse or environment errors
    pub fn load(path: Option<&Path>) -> ProbeResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        match dotenvy::dotenv() {
            Ok(file) => tracing::debug!(file = %file.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(ProbeError::config(format!(".env: {e}"))),
        }
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error for an invalid seed or a non-boolean flag
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ProbeResult<()> {
        if let Some(seed) = lookup(ENV_WALLET_SEED).filter(|s| !s.trim().is_empty()) {
            self.seed = Some(SeedPhrase::parse(&seed).map_err(|e| ProbeError::config(format!("{ENV_WALLET_SEED}: {e}")))?);
        }
        if let Some(url) = lookup(ENV_APP_URL).filter(|s| !s.is_empty()) {
            self.app_url = url;
        }
        if let Some(raw) = lookup(ENV_HEADLESS) {
            self.headless = parse_flag(ENV_HEADLESS, &raw)?;
        }
        if let Some(ci) = lookup(ENV_CI) {
            if parse_flag(ENV_CI, &ci).unwrap_or(true) {
                self.headless = true;
            }
        }
        if let Some(path) = lookup(ENV_EXTENSION_PATH).filter(|s| !s.is_empty()) {
            self.browser.extension_path = Some(path.into());
        }
        if let Some(path) = lookup(ENV_CHROMIUM_PATH).filter(|s| !s.is_empty()) {
            self.browser.chromium_path = Some(path.into());
        }
        Ok(())
    }

    /// Check everything that can be checked without a browser
    ///
    /// # Errors
    ///
    /// `Config` naming the first bad value
    pub fn validate(&self) -> ProbeResult<()> {
        if !(self.app_url.starts_with("http://") || self.app_url.starts_with("https://")) {
            return Err(ProbeError::config(format!("app_url '{}' is not an http(s) URL", self.app_url)));
        }
        let t = &self.timeouts;
        if t.action_ms == 0 || t.probe_ms == 0 || t.navigation_ms == 0 || t.poll_ms == 0 {
            return Err(ProbeError::config("timeouts must be positive"));
        }
        if t.poll_ms > t.probe_ms {
            return Err(ProbeError::config("poll_ms must not exceed probe_ms"));
        }
        self.network
            .validate()
            .and_then(|()| self.token.validate())
            .map_err(|e| ProbeError::config(e.to_string()))
    }

    /// The configured seed
    ///
    /// # Errors
    ///
    /// `Config` if none was provided
    pub fn seed(&self) -> ProbeResult<&SeedPhrase> {
        self.seed
            .as_ref()
            .ok_or_else(|| ProbeError::config(format!("no seed phrase configured; set {ENV_WALLET_SEED}")))
    }

    /// Part of the URL that identifies the application's tab
    #[must_use]
    pub fn app_host(&self) -> &str {
        let rest = self
            .app_url
            .split_once("://")
            .map_or(self.app_url.as_str(), |(_, rest)| rest);
        rest.split('/').next().unwrap_or(rest)
    }

    /// Bootstrap input, with an optional per-scenario seed
    ///
    /// # Errors
    ///
    /// `Config` if neither an override nor a configured seed exists
    pub fn bootstrap_config(&self, seed_override: Option<&SeedPhrase>) -> ProbeResult<BootstrapConfig> {
        let seed = match seed_override {
            Some(seed) => seed.clone(),
            None => self.seed()?.clone(),
        };
        Ok(BootstrapConfig::new(seed)
            .with_headless(self.headless)
            .with_timeouts(self.timeouts)
            .with_browser(self.browser.clone()))
    }

    /// YAML rendering with the seed redacted
    ///
    /// # Errors
    ///
    /// Serialization failure
    pub fn to_redacted_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bootstrap::HARDHAT_MNEMONIC;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    mod default_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = SuiteConfig::default();
            assert_eq!(config.app_url, ui::APP_URL);
            assert!(config.seed.is_none());
            assert!(!config.headless);
            assert_eq!(config.timeouts.action_ms, 10_000);
            assert_eq!(config.network.chain_id, 421_614);
            assert_eq!(config.token.symbol, "TUSD");
            assert_eq!(config.staging_toggle, StagingToggle::Position { index: 1 });
            config.validate().unwrap();
        }

        #[test]
        fn test_missing_seed_is_config_error() {
            let err = SuiteConfig::default().bootstrap_config(None).unwrap_err();
            assert!(matches!(err, ProbeError::Config { .. }));
            assert!(err.to_string().contains("WALLET_SEED"));
        }

        #[test]
        fn test_app_host() {
            let mut config = SuiteConfig::default();
            assert_eq!(config.app_host(), "zerog-stg.netlify.app");
            config.app_url = "http://localhost:5173".into();
            assert_eq!(config.app_host(), "localhost:5173");
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_partial_yaml() {
            let config = SuiteConfig::from_yaml_str(
                "headless: true\ntimeouts:\n  action_ms: 500\nstaging_toggle:\n  by: named\n  role: button\n  name: Settings\n",
            )
            .unwrap();
            assert!(config.headless);
            assert_eq!(config.timeouts.action_ms, 500);
            assert_eq!(config.timeouts.probe_ms, 2_000);
            assert_eq!(
                config.staging_toggle,
                StagingToggle::Named {
                    role: "button".into(),
                    name: "Settings".into()
                }
            );
        }

        #[test]
        fn test_bad_seed_in_yaml_fails() {
            assert!(SuiteConfig::from_yaml_str("seed: one two three\n").is_err());
        }

        #[test]
        fn test_redacted_yaml_hides_seed() {
            let mut config = SuiteConfig::default();
            config.seed = Some(SeedPhrase::parse(HARDHAT_MNEMONIC).unwrap());
            let yaml = config.to_redacted_yaml().unwrap();
            assert!(!yaml.contains("junk"));
            assert!(yaml.contains("redacted"));
        }

        #[test]
        fn test_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("suite.yaml");
            std::fs::write(&path, "app_url: http://localhost:3000/\n").unwrap();
            let config = SuiteConfig::from_file(&path).unwrap();
            assert_eq!(config.app_url, "http://localhost:3000/");
        }
    }

    mod env_tests {
        use super::*;

        #[test]
        fn test_env_overrides() {
            let mut config = SuiteConfig::default();
            config
                .apply_env_with(env(&[
                    (ENV_WALLET_SEED, HARDHAT_MNEMONIC),
                    (ENV_APP_URL, "http://localhost:8080/"),
                    (ENV_EXTENSION_PATH, "/opt/metamask"),
                    (ENV_CHROMIUM_PATH, "/usr/bin/chromium"),
                ]))
                .unwrap();
            assert_eq!(config.seed().unwrap().word_count(), 12);
            assert_eq!(config.app_url, "http://localhost:8080/");
            assert!(config.browser.extension_path.is_some());
            assert!(config.browser.chromium_path.is_some());
        }

        #[test]
        fn test_ci_forces_headless() {
            let mut config = SuiteConfig::default();
            config
                .apply_env_with(env(&[(ENV_HEADLESS, "false"), (ENV_CI, "true")]))
                .unwrap();
            assert!(config.headless);

            let mut config = SuiteConfig::default();
            config.apply_env_with(env(&[(ENV_CI, "0")])).unwrap();
            assert!(!config.headless);
        }

        #[test]
        fn test_bad_flag() {
            let mut config = SuiteConfig::default();
            let err = config.apply_env_with(env(&[(ENV_HEADLESS, "maybe")])).unwrap_err();
            assert!(err.to_string().contains("IDOPROBE_HEADLESS"));
        }

        #[test]
        fn test_bad_seed_names_variable() {
            let mut config = SuiteConfig::default();
            let err = config.apply_env_with(env(&[(ENV_WALLET_SEED, "too short")])).unwrap_err();
            assert!(err.to_string().contains("WALLET_SEED"));
        }
    }

    mod validation_tests {
        use super::*;

        #[test]
        fn test_rejects_non_http_url() {
            let mut config = SuiteConfig::default();
            config.app_url = "ftp://example".into();
            assert!(config.validate().is_err());
        }

        #[test]
        fn test_rejects_zero_timeout() {
            let mut config = SuiteConfig::default();
            config.timeouts.probe_ms = 0;
            assert!(config.validate().is_err());
        }
    }

    mod toggle_tests {
        use super::*;

        #[test]
        fn test_position_opener() {
            assert_eq!(
                StagingToggle::default().opener().to_string(),
                "role=navigation >> role=button >> nth=1"
            );
        }

        #[test]
        fn test_named_opener() {
            let toggle = StagingToggle::Named {
                role: "button".into(),
                name: "Settings".into(),
            };
            assert_eq!(
                toggle.opener().to_string(),
                "role=navigation >> role=button[name=\"Settings\"i]"
            );
        }
    }
}
