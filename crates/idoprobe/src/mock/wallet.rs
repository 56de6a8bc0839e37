//! Simulated wallet extension.

use super::app::{SharedApp, SimulatedApp, WalletRequest};
use crate::chain::{NetworkDefinition, TokenDefinition};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{poll_until, WaitOptions};
use crate::wallet::Wallet;
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

/// Wallet that answers requests raised by the simulated application
#[derive(Debug)]
pub struct SimulatedWallet {
    app: SharedApp,
    prompt: WaitOptions,
    history: Mutex<Vec<String>>,
}

impl SimulatedWallet {
    /// Wallet over a shared world; `prompt` bounds the wait for a request
    #[must_use]
    pub fn new(app: SharedApp, prompt: WaitOptions) -> Self {
        Self {
            app,
            prompt,
            history: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> ProbeResult<MutexGuard<'_, SimulatedApp>> {
        self.app
            .lock()
            .map_err(|_| ProbeError::wallet("lock", "simulated app lock poisoned"))
    }

    fn record(&self, call: impl Into<String>) {
        if let Ok(mut history) = self.history.lock() {
            history.push(call.into());
        }
    }

    /// Gestures performed so far
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    async fn await_request(&self, operation: &str, accept: fn(WalletRequest) -> bool) -> ProbeResult<()> {
        let outcome = poll_until(self.prompt, move || async move {
            let pending = self.lock()?.pending_request();
            Ok::<_, ProbeError>((pending.is_some_and(accept), ()))
        })
        .await?;
        if outcome.is_ready() {
            Ok(())
        } else {
            Err(ProbeError::InteractionTimeout {
                locator: "wallet popup".to_string(),
                state: format!("showing a request to {operation}"),
                ms: self.prompt.timeout_ms,
            })
        }
    }
}

fn is_connect(r: WalletRequest) -> bool {
    r == WalletRequest::Connect
}

fn is_signable(r: WalletRequest) -> bool {
    !is_connect(r)
}

#[async_trait]
impl Wallet for SimulatedWallet {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn approve(&self) -> ProbeResult<()> {
        self.await_request("approve", is_connect).await?;
        self.record("approve");
        self.lock()?.wallet_approve()
    }

    async fn sign(&self) -> ProbeResult<()> {
        self.await_request("sign", is_signable).await?;
        self.record("sign");
        self.lock()?.wallet_sign()
    }

    async fn reject(&self) -> ProbeResult<()> {
        self.await_request("reject", |_| true).await?;
        self.record("reject");
        self.lock()?.wallet_reject()
    }

    async fn add_network(&self, network: &NetworkDefinition) -> ProbeResult<()> {
        self.record(format!("add_network:{}", network.name));
        self.lock()?.add_network(network)
    }

    async fn switch_network(&self, name: &str) -> ProbeResult<()> {
        self.record(format!("switch_network:{name}"));
        self.lock()?.switch_network(name)
    }

    async fn add_token(&self, token: &TokenDefinition) -> ProbeResult<()> {
        self.record(format!("add_token:{}", token.symbol));
        self.lock()?.add_token(token);
        Ok(())
    }

    async fn create_account(&self) -> ProbeResult<()> {
        self.record("create_account");
        self.lock()?.create_account();
        Ok(())
    }

    async fn switch_account(&self, index: usize) -> ProbeResult<()> {
        self.record(format!("switch_account:{index}"));
        self.lock()?.switch_account(index)
    }
}
