//! Network and token definitions registered in the wallet.

use crate::result::{ProbeError, ProbeResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Longest ticker symbol wallets accept
pub const MAX_SYMBOL_LEN: usize = 11;

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("address pattern compiles"))
}

fn check_symbol(stage: &str, symbol: &str) -> ProbeResult<()> {
    if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN {
        return Err(ProbeError::setup(
            stage,
            format!("symbol '{symbol}' must be 1..={MAX_SYMBOL_LEN} characters"),
        ));
    }
    Ok(())
}

/// An EVM network the wallet can be pointed at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDefinition {
    /// Display name
    pub name: String,
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// EIP-155 chain id
    pub chain_id: u64,
    /// Native currency symbol
    pub symbol: String,
}

impl NetworkDefinition {
    /// Arbitrum Sepolia testnet
    #[must_use]
    pub fn arbitrum_sepolia() -> Self {
        Self {
            name: "Arbitrum Sepolia".to_string(),
            rpc_url: "https://sepolia-rollup.arbitrum.io/rpc".to_string(),
            chain_id: 421_614,
            symbol: "ETH".to_string(),
        }
    }

    /// Chain id as the `0x`-prefixed hex wallets report
    #[must_use]
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    /// Reject definitions no wallet would accept
    ///
    /// # Errors
    ///
    /// Returns a `Setup` error naming the offending field
    pub fn validate(&self) -> ProbeResult<()> {
        const STAGE: &str = "add network";
        if self.name.trim().is_empty() {
            return Err(ProbeError::setup(STAGE, "network name is empty"));
        }
        if !(self.rpc_url.starts_with("https://") || self.rpc_url.starts_with("http://")) {
            return Err(ProbeError::setup(
                STAGE,
                format!("RPC URL '{}' is not http(s)", self.rpc_url),
            ));
        }
        if self.chain_id == 0 {
            return Err(ProbeError::setup(STAGE, "chain id must be non-zero"));
        }
        check_symbol(STAGE, &self.symbol)
    }
}

impl Default for NetworkDefinition {
    fn default() -> Self {
        Self::arbitrum_sepolia()
    }
}

/// An ERC-20 token to show in the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDefinition {
    /// Contract address
    pub address: String,
    /// Ticker symbol
    pub symbol: String,
}

impl TokenDefinition {
    /// Test USD token on Arbitrum Sepolia
    #[must_use]
    pub fn tusd() -> Self {
        Self {
            address: "0x51c94B0C9d787d4E16c46b1630D5e791bf40F816".to_string(),
            symbol: "TUSD".to_string(),
        }
    }

    /// Reject definitions no wallet would accept
    ///
    /// # Errors
    ///
    /// Returns a `Setup` error naming the offending field
    pub fn validate(&self) -> ProbeResult<()> {
        const STAGE: &str = "add token";
        if !address_pattern().is_match(&self.address) {
            return Err(ProbeError::setup(
                STAGE,
                format!("'{}' is not a 20-byte hex address", self.address),
            ));
        }
        check_symbol(STAGE, &self.symbol)
    }
}

impl Default for TokenDefinition {
    fn default() -> Self {
        Self::tusd()
    }
}
