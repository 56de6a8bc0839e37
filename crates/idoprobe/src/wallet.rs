//! Wallet extension capability.
//!
//! [`Wallet`] is what a backend implements: one method per user gesture in
//! the extension. [`WalletHandle`] is what scenarios hold. It keeps a
//! registry of what was configured so that setup mistakes surface as
//! `Setup` errors instead of undefined extension behaviour:
//!
//! - a network must be added before it can be switched to
//! - each network is added once per wallet
//! - a token needs an active network, and is added once per account

use crate::chain::{NetworkDefinition, TokenDefinition};
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Gestures a wallet extension supports
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Approve a pending connection request
    async fn approve(&self) -> ProbeResult<()>;

    /// Confirm a pending signature or transaction
    async fn sign(&self) -> ProbeResult<()>;

    /// Reject a pending signature or transaction
    async fn reject(&self) -> ProbeResult<()>;

    /// Register a custom network
    async fn add_network(&self, network: &NetworkDefinition) -> ProbeResult<()>;

    /// Make a registered network active
    async fn switch_network(&self, name: &str) -> ProbeResult<()>;

    /// Import a token for the active account
    async fn add_token(&self, token: &TokenDefinition) -> ProbeResult<()>;

    /// Derive a new account from the seed
    async fn create_account(&self) -> ProbeResult<()>;

    /// Select an account by 1-based position
    async fn switch_account(&self, index: usize) -> ProbeResult<()>;
}

#[derive(Debug)]
struct Registry {
    networks: Vec<NetworkDefinition>,
    active_network: Option<String>,
    /// (account, token address)
    tokens: Vec<(usize, String)>,
    accounts: usize,
    active_account: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            networks: Vec::new(),
            active_network: None,
            tokens: Vec::new(),
            accounts: 1,
            active_account: 1,
        }
    }
}

/// A wallet bound to one browser context
#[derive(Clone)]
pub struct WalletHandle {
    inner: Arc<dyn Wallet>,
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for WalletHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletHandle")
            .field("wallet", &self.inner.name())
            .field("registry", &self.registry)
            .finish()
    }
}

impl WalletHandle {
    /// Wrap a freshly bootstrapped wallet
    #[must_use]
    pub fn new(inner: Arc<dyn Wallet>) -> Self {
        Self {
            inner,
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    fn with_registry<T>(&self, f: impl FnOnce(&mut Registry) -> T) -> ProbeResult<T> {
        let mut guard = self
            .registry
            .lock()
            .map_err(|_| ProbeError::wallet("registry", "wallet registry lock poisoned"))?;
        Ok(f(&mut guard))
    }

    /// Approve a pending connection request
    ///
    /// # Errors
    ///
    /// Returns error if no request shows up within the bound
    pub async fn approve(&self) -> ProbeResult<()> {
        tracing::info!(wallet = self.inner.name(), "approving connection");
        self.inner.approve().await
    }

    /// Confirm a pending signature or transaction
    ///
    /// # Errors
    ///
    /// Returns error if nothing is pending within the bound
    pub async fn sign(&self) -> ProbeResult<()> {
        tracing::info!(wallet = self.inner.name(), "signing");
        self.inner.sign().await
    }

    /// Reject a pending signature or transaction
    ///
    /// # Errors
    ///
    /// Returns error if nothing is pending within the bound
    pub async fn reject(&self) -> ProbeResult<()> {
        tracing::info!(wallet = self.inner.name(), "rejecting");
        self.inner.reject().await
    }

    /// Register a network. Each network is registered once.
    ///
    /// # Errors
    ///
    /// `Setup` if the definition is invalid or already registered
    pub async fn add_network(&self, network: &NetworkDefinition) -> ProbeResult<()> {
        network.validate()?;
        let duplicate =
            self.with_registry(|r| r.networks.iter().any(|n| n.name == network.name))?;
        if duplicate {
            return Err(ProbeError::setup(
                "add network",
                format!("network '{}' is already registered", network.name),
            ));
        }
        tracing::info!(network = %network.name, chain_id = network.chain_id, "adding network");
        self.inner.add_network(network).await?;
        self.with_registry(|r| r.networks.push(network.clone()))
    }

    /// Switch to a registered network
    ///
    /// # Errors
    ///
    /// `Setup` if the network was never added
    pub async fn switch_network(&self, name: &str) -> ProbeResult<()> {
        let known = self.with_registry(|r| r.networks.iter().any(|n| n.name == name))?;
        if !known {
            return Err(ProbeError::setup(
                "switch network",
                format!("network '{name}' must be added before switching to it"),
            ));
        }
        tracing::info!(network = name, "switching network");
        self.inner.switch_network(name).await?;
        self.with_registry(|r| r.active_network = Some(name.to_string()))
    }

    /// Import a token for the active account
    ///
    /// # Errors
    ///
    /// `Setup` if no network is active, the definition is invalid, or the
    /// token is already imported for this account
    pub async fn add_token(&self, token: &TokenDefinition) -> ProbeResult<()> {
        token.validate()?;
        let (active_network, account, duplicate) = self.with_registry(|r| {
            let account = r.active_account;
            let duplicate = r
                .tokens
                .iter()
                .any(|(a, addr)| *a == account && addr.eq_ignore_ascii_case(&token.address));
            (r.active_network.clone(), account, duplicate)
        })?;
        if active_network.is_none() {
            return Err(ProbeError::setup(
                "add token",
                "switch to the token's network before adding it",
            ));
        }
        if duplicate {
            return Err(ProbeError::setup(
                "add token",
                format!("{} is already imported for account {account}", token.symbol),
            ));
        }
        tracing::info!(symbol = %token.symbol, account, "adding token");
        self.inner.add_token(token).await?;
        self.with_registry(|r| r.tokens.push((account, token.address.clone())))
    }

    /// Derive a new account; returns its 1-based index
    ///
    /// # Errors
    ///
    /// Returns error if the extension refuses
    pub async fn create_account(&self) -> ProbeResult<usize> {
        self.inner.create_account().await?;
        let index = self.with_registry(|r| {
            r.accounts += 1;
            r.accounts
        })?;
        tracing::info!(account = index, "created account");
        Ok(index)
    }

    /// Select an account by 1-based position
    ///
    /// # Errors
    ///
    /// `Wallet` if the account does not exist
    pub async fn switch_account(&self, index: usize) -> ProbeResult<()> {
        let accounts = self.with_registry(|r| r.accounts)?;
        if index == 0 || index > accounts {
            return Err(ProbeError::wallet(
                "switch account",
                format!("account {index} does not exist (wallet has {accounts})"),
            ));
        }
        tracing::info!(account = index, "switching account");
        self.inner.switch_account(index).await?;
        self.with_registry(|r| r.active_account = index)
    }

    /// Name of the active network
    #[must_use]
    pub fn active_network(&self) -> Option<String> {
        self.with_registry(|r| r.active_network.clone()).ok().flatten()
    }

    /// 1-based index of the active account
    #[must_use]
    pub fn active_account(&self) -> usize {
        self.with_registry(|r| r.active_account).unwrap_or(1)
    }

    /// Whether a network of that name is registered
    #[must_use]
    pub fn has_network(&self, name: &str) -> bool {
        self.with_registry(|r| r.networks.iter().any(|n| n.name == name))
            .unwrap_or(false)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Wallet double that records every gesture
    #[derive(Debug, Default)]
    struct RecordingWallet {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingWallet {
        fn record(&self, call: String) -> ProbeResult<()> {
            self.calls.lock().unwrap().push(call);
            Ok(())
        }

        fn history(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Wallet for RecordingWallet {
        fn name(&self) -> &str {
            "recording"
        }
        async fn approve(&self) -> ProbeResult<()> {
            self.record("approve".into())
        }
        async fn sign(&self) -> ProbeResult<()> {
            self.record("sign".into())
        }
        async fn reject(&self) -> ProbeResult<()> {
            self.record("reject".into())
        }
        async fn add_network(&self, network: &NetworkDefinition) -> ProbeResult<()> {
            self.record(format!("add_network:{}", network.name))
        }
        async fn switch_network(&self, name: &str) -> ProbeResult<()> {
            self.record(format!("switch_network:{name}"))
        }
        async fn add_token(&self, token: &TokenDefinition) -> ProbeResult<()> {
            self.record(format!("add_token:{}", token.symbol))
        }
        async fn create_account(&self) -> ProbeResult<()> {
            self.record("create_account".into())
        }
        async fn switch_account(&self, index: usize) -> ProbeResult<()> {
            self.record(format!("switch_account:{index}"))
        }
    }

    fn handle() -> (WalletHandle, Arc<RecordingWallet>) {
        let wallet = Arc::new(RecordingWallet::default());
        (WalletHandle::new(wallet.clone()), wallet)
    }

    mod network_tests {
        use super::*;

        #[tokio::test]
        async fn test_switch_before_add_is_setup_error() {
            let (handle, wallet) = handle();
            let err = handle.switch_network("Arbitrum Sepolia").await.unwrap_err();
            assert!(err.is_setup_failure());
            assert!(wallet.history().is_empty());
        }

        #[tokio::test]
        async fn test_add_then_switch() {
            let (handle, wallet) = handle();
            handle
                .add_network(&NetworkDefinition::arbitrum_sepolia())
                .await
                .unwrap();
            handle.switch_network("Arbitrum Sepolia").await.unwrap();
            assert_eq!(handle.active_network().as_deref(), Some("Arbitrum Sepolia"));
            assert_eq!(
                wallet.history(),
                vec!["add_network:Arbitrum Sepolia", "switch_network:Arbitrum Sepolia"]
            );
        }

        #[tokio::test]
        async fn test_second_add_rejected() {
            let (handle, _) = handle();
            let net = NetworkDefinition::arbitrum_sepolia();
            handle.add_network(&net).await.unwrap();
            let err = handle.add_network(&net).await.unwrap_err();
            assert!(err.to_string().contains("already registered"));
        }
    }

    mod token_tests {
        use super::*;

        #[tokio::test]
        async fn test_token_requires_active_network() {
            let (handle, _) = handle();
            let err = handle.add_token(&TokenDefinition::tusd()).await.unwrap_err();
            assert!(err.is_setup_failure());
        }

        #[tokio::test]
        async fn test_token_once_per_account() {
            let (handle, _) = handle();
            handle
                .add_network(&NetworkDefinition::arbitrum_sepolia())
                .await
                .unwrap();
            handle.switch_network("Arbitrum Sepolia").await.unwrap();
            handle.add_token(&TokenDefinition::tusd()).await.unwrap();
            assert!(handle.add_token(&TokenDefinition::tusd()).await.is_err());

            assert_eq!(handle.create_account().await.unwrap(), 2);
            handle.switch_account(2).await.unwrap();
            handle.add_token(&TokenDefinition::tusd()).await.unwrap();
        }
    }

    mod account_tests {
        use super::*;

        #[tokio::test]
        async fn test_switch_to_missing_account() {
            let (handle, _) = handle();
            assert!(handle.switch_account(2).await.is_err());
            assert!(handle.switch_account(0).await.is_err());
            handle.switch_account(1).await.unwrap();
            assert_eq!(handle.active_account(), 1);
        }
    }
}
