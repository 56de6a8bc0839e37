//! In-process model of the staging sale application and the wallet extension.
//!
//! Both halves live in one [`SimulatedApp`] because every interesting
//! transition crosses between them: the app raises a request, the wallet
//! answers it, the app re-renders.

use super::dom::{Dom, Node};
use crate::chain::{NetworkDefinition, TokenDefinition};
use crate::result::{ProbeError, ProbeResult};
use crate::ui;
use std::sync::{Arc, Mutex};

/// Shared handle to one simulated world (one per browser context)
pub type SharedApp = Arc<Mutex<SimulatedApp>>;

/// TUSD per NODE
pub const NODE_PRICE_TUSD: u64 = 1;

/// TUSD held by the first account of a funded seed
pub const FUNDED_BALANCE_TUSD: u64 = 1_000;

/// Chain id the wallet starts on (Ethereum mainnet)
const DEFAULT_CHAIN_ID: u64 = 1;

/// Request waiting in the extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletRequest {
    /// dApp asked to connect
    Connect,
    /// TUSD spending allowance
    Allowance {
        /// Allowance requested
        amount: u64,
    },
    /// Node purchase transaction
    Purchase {
        /// Nodes bought
        quantity: u64,
    },
}

/// Outcome banner under the sale panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseStatus {
    /// "Purchased N NODE"
    Purchased(u64),
    /// "Your recent purchase attempt was unsuccessful"
    Failed,
}

#[derive(Debug, Clone, Default)]
struct Account {
    tusd: u64,
    allowance: u64,
    tokens: Vec<String>,
}

/// Keep what a numeric field keeps: digits, sign and point, truncated to an
/// integer. Anything that does not parse as a number becomes empty.
#[must_use]
pub fn normalize_amount(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
        .collect();
    match kept.parse::<f64>() {
        Ok(x) if x.is_finite() => format!("{}", x.trunc() as i64),
        _ => String::new(),
    }
}

/// Simulated application + extension state
#[derive(Debug, Clone)]
pub struct SimulatedApp {
    app_url: String,
    target_chain_id: u64,
    // extension
    accounts: Vec<Account>,
    active_account: usize,
    networks: Vec<NetworkDefinition>,
    chain_id: u64,
    pending: Option<WalletRequest>,
    // application
    settings_open: bool,
    staging: bool,
    connect_dialog_open: bool,
    connected: bool,
    sale_open: bool,
    amount: String,
    terms_accepted: bool,
    terms_open: bool,
    waiting_open: bool,
    purchase_pending: bool,
    approving: bool,
    status: Option<PurchaseStatus>,
    share_open: bool,
    successes: u32,
    nodes_owned: u64,
}

impl Default for SimulatedApp {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SimulatedApp {
    /// Fresh world; `funded` decides whether account 1 holds TUSD
    #[must_use]
    pub fn new(funded: bool) -> Self {
        let first = Account {
            tusd: if funded { FUNDED_BALANCE_TUSD } else { 0 },
            ..Account::default()
        };
        Self {
            app_url: ui::APP_URL.to_string(),
            target_chain_id: NetworkDefinition::arbitrum_sepolia().chain_id,
            accounts: vec![first],
            active_account: 0,
            networks: Vec::new(),
            chain_id: DEFAULT_CHAIN_ID,
            pending: None,
            settings_open: false,
            staging: false,
            connect_dialog_open: false,
            connected: false,
            sale_open: false,
            amount: String::new(),
            terms_accepted: false,
            terms_open: false,
            waiting_open: false,
            purchase_pending: false,
            approving: false,
            status: None,
            share_open: false,
            successes: 0,
            nodes_owned: 0,
        }
    }

    /// Serve the app at another URL
    #[must_use]
    pub fn with_app_url(mut self, url: impl Into<String>) -> Self {
        self.app_url = url.into();
        self
    }

    /// Chain the sale contract lives on
    #[must_use]
    pub const fn with_target_chain(mut self, chain_id: u64) -> Self {
        self.target_chain_id = chain_id;
        self
    }

    /// Wrap for sharing between pages and the wallet
    #[must_use]
    pub fn into_shared(self) -> SharedApp {
        Arc::new(Mutex::new(self))
    }

    /// Whether `url` is served by the application
    #[must_use]
    pub fn serves(&self, url: &str) -> bool {
        url.trim_end_matches('/')
            .starts_with(self.app_url.trim_end_matches('/'))
    }

    // ------------------------------------------------------------------
    // Application
    // ------------------------------------------------------------------

    fn quantity(&self) -> Option<i64> {
        self.amount.parse().ok()
    }

    fn account(&self) -> &Account {
        &self.accounts[self.active_account]
    }

    fn account_mut(&mut self) -> &mut Account {
        &mut self.accounts[self.active_account]
    }

    /// Label and enabled state of the sale panel's action button
    #[must_use]
    pub fn action_button(&self) -> (&'static str, bool) {
        if !self.connected {
            return ("Connect your wallet first", false);
        }
        if self.purchase_pending {
            return (ui::PURCHASE, false);
        }
        if self.chain_id != self.target_chain_id {
            return ("Wrong Network", false);
        }
        let q = match self.quantity() {
            Some(q) if q > 0 => q as u64,
            _ => return (ui::ENTER_AN_AMOUNT, false),
        };
        if q >= ui::PURCHASE_LIMIT {
            return (ui::EXCEEDED_PURCHASE_LIMIT, false);
        }
        let cost = q * NODE_PRICE_TUSD;
        if cost > self.account().tusd {
            return (ui::INSUFFICIENT_BALANCE, false);
        }
        if self.approving {
            return ("Approving...", false);
        }
        if self.account().allowance < cost {
            return (ui::APPROVE, true);
        }
        (ui::PURCHASE, true)
    }

    fn start_purchase(&mut self) {
        let quantity = self.quantity().map_or(0, |q| q.max(0) as u64);
        self.pending = Some(WalletRequest::Purchase { quantity });
        self.purchase_pending = true;
        self.waiting_open = true;
        self.status = None;
    }

    /// Route a click to its handler
    ///
    /// # Errors
    ///
    /// Returns error for an unknown routing key
    pub fn click(&mut self, action: &str) -> ProbeResult<()> {
        match action {
            "nav-sales" => {}
            "nav-settings" => self.settings_open = !self.settings_open,
            "staging-toggle" => {
                self.staging = !self.staging;
                if !self.staging {
                    self.sale_open = false;
                }
            }
            "nav-connect" => {
                if !self.connected {
                    self.connect_dialog_open = true;
                }
            }
            "wallet-option-metamask" => self.pending = Some(WalletRequest::Connect),
            "connect-close" => {
                self.connect_dialog_open = false;
                if self.pending == Some(WalletRequest::Connect) {
                    self.pending = None;
                }
            }
            "sale-card" => self.sale_open = true,
            "action-button" => match self.action_button() {
                (ui::APPROVE, true) => {
                    let amount = self.quantity().map_or(0, |q| q as u64) * NODE_PRICE_TUSD;
                    self.approving = true;
                    self.pending = Some(WalletRequest::Allowance { amount });
                }
                (ui::PURCHASE, true) => {
                    if self.terms_accepted {
                        self.start_purchase();
                    } else {
                        self.terms_open = true;
                    }
                }
                _ => {}
            },
            "terms-agree" => {
                self.terms_accepted = true;
                self.terms_open = false;
                self.start_purchase();
            }
            "dialog-close" => {
                if self.terms_open {
                    self.terms_open = false;
                } else {
                    self.waiting_open = false;
                }
            }
            "share-close" => self.share_open = false,
            other => {
                return Err(ProbeError::page(format!("element '{other}' is not clickable")));
            }
        }
        Ok(())
    }

    /// Route typed text to its field
    ///
    /// # Errors
    ///
    /// Returns error for an element that is not a text field
    pub fn fill(&mut self, action: &str, value: &str) -> ProbeResult<()> {
        match action {
            "amount" => {
                self.amount = normalize_amount(value);
                Ok(())
            }
            other => Err(ProbeError::page(format!("element '{other}' is not editable"))),
        }
    }

    /// Render the current state
    #[must_use]
    pub fn render(&self) -> Dom {
        let nav_account = if self.connected {
            format!("Account {}", self.active_account + 1)
        } else {
            ui::CONNECT_WALLET.to_string()
        };

        let header = Node::new("header")
            .child(
                Node::new("nav")
                    .child(Node::button("Sales", "nav-sales"))
                    .child(Node::button("", "nav-settings").label("Settings"))
                    .child(Node::button(nav_account, "nav-connect")),
            )
            .child_if(self.settings_open, || {
                Node::new("div")
                    .role("menu")
                    .child(Node::checkbox(ui::STAGING_CHECKBOX, self.staging, "staging-toggle"))
            });

        let (label, enabled) = self.action_button();
        let main = Node::new("main")
            .child(Node::new("h2").text("Sales"))
            .child_if(self.staging, || Node::button(ui::SALE_CARD, "sale-card"))
            .child_if(self.staging && self.sale_open, || {
                Node::new("section")
                    .child(Node::new("h3").text("Test Sales Interview"))
                    .child(Node::text_input(ui::TOKEN_AMOUNT, &self.amount, "amount"))
                    .child(Node::new("p").text(format!("Price: {NODE_PRICE_TUSD} TUSD per NODE")))
                    .child(Node::button(label, "action-button").disabled(!enabled))
                    .child_if(self.status.is_some(), || {
                        let text = match self.status {
                            Some(PurchaseStatus::Purchased(n)) => ui::purchased_text(n),
                            _ => ui::PURCHASE_FAILED.to_string(),
                        };
                        Node::new("p").text(text)
                    })
            });

        let body = Node::new("body")
            .child(header)
            .child(main)
            .child_if(self.connect_dialog_open, || {
                Node::new("dialog")
                    .modal()
                    .child(Node::new("h2").text("Connect a Wallet"))
                    .child(
                        Node::button("MetaMask", "wallet-option-metamask")
                            .test_id(ui::METAMASK_OPTION_TEST_ID),
                    )
                    .child_if(self.pending == Some(WalletRequest::Connect), || {
                        Node::new("p").text("Opening MetaMask...")
                    })
                    .child(Node::button("", "connect-close").label("Close"))
            })
            .child_if(self.terms_open, || {
                Node::new("dialog")
                    .modal()
                    .child(Node::new("h2").text(ui::CONFIRM_PURCHASE))
                    .child(Node::new("p").text("By continuing you accept the sale terms."))
                    .child(Node::button(ui::AGREE, "terms-agree"))
                    .child(Node::button("", "dialog-close").label(ui::CLOSE_DIALOG_LABEL))
            })
            .child_if(self.waiting_open, || {
                Node::new("dialog")
                    .modal()
                    .child(Node::new("h2").text(ui::WAITING_FOR_SIGNATURE))
                    .child(Node::new("p").text("Check your wallet to continue."))
                    .child(Node::button("", "dialog-close").label(ui::CLOSE_DIALOG_LABEL))
            })
            .child_if(self.share_open, || {
                Node::new("dialog")
                    .modal()
                    .child(
                        Node::new("div")
                            .text(ui::SHARE_DIALOG_TITLE)
                            .child(Node::button("", "share-close").label("Close")),
                    )
                    .child(Node::new("p").text("Invite friends and earn a share of every sale."))
            });

        Dom::build(body)
    }

    // ------------------------------------------------------------------
    // Extension
    // ------------------------------------------------------------------

    /// Request waiting in the extension
    #[must_use]
    pub const fn pending_request(&self) -> Option<WalletRequest> {
        self.pending
    }

    /// Approve a pending connection
    ///
    /// # Errors
    ///
    /// Returns error if no connection request is pending
    pub fn wallet_approve(&mut self) -> ProbeResult<()> {
        if self.pending != Some(WalletRequest::Connect) {
            return Err(ProbeError::wallet("approve", "no connection request pending"));
        }
        self.pending = None;
        self.connected = true;
        self.connect_dialog_open = false;
        Ok(())
    }

    /// Confirm the pending signature
    ///
    /// # Errors
    ///
    /// Returns error if nothing signable is pending or funds ran out
    pub fn wallet_sign(&mut self) -> ProbeResult<()> {
        match self.pending {
            Some(WalletRequest::Allowance { amount }) => {
                self.account_mut().allowance = amount;
                self.approving = false;
            }
            Some(WalletRequest::Purchase { quantity }) => {
                let cost = quantity * NODE_PRICE_TUSD;
                let account = self.account_mut();
                if account.tusd < cost || account.allowance < cost {
                    return Err(ProbeError::wallet("sign", "transaction would revert"));
                }
                account.tusd -= cost;
                account.allowance -= cost;
                self.nodes_owned += quantity;
                self.purchase_pending = false;
                self.waiting_open = false;
                self.status = Some(PurchaseStatus::Purchased(quantity));
                self.successes += 1;
                self.share_open = self.successes == 1;
            }
            Some(WalletRequest::Connect) | None => {
                return Err(ProbeError::wallet("sign", "no signature request pending"));
            }
        }
        self.pending = None;
        Ok(())
    }

    /// Reject the pending request
    ///
    /// # Errors
    ///
    /// Returns error if nothing is pending
    pub fn wallet_reject(&mut self) -> ProbeResult<()> {
        match self.pending.take() {
            Some(WalletRequest::Connect) => {}
            Some(WalletRequest::Allowance { .. }) => self.approving = false,
            Some(WalletRequest::Purchase { .. }) => {
                self.purchase_pending = false;
                self.waiting_open = false;
                self.status = Some(PurchaseStatus::Failed);
            }
            None => return Err(ProbeError::wallet("reject", "no request pending")),
        }
        Ok(())
    }

    /// Register a network in the extension
    ///
    /// # Errors
    ///
    /// Returns error if a network of that name exists
    pub fn add_network(&mut self, network: &NetworkDefinition) -> ProbeResult<()> {
        if self.networks.iter().any(|n| n.name == network.name) {
            return Err(ProbeError::wallet(
                "add network",
                format!("'{}' already exists", network.name),
            ));
        }
        self.networks.push(network.clone());
        Ok(())
    }

    /// Select a registered network
    ///
    /// # Errors
    ///
    /// Returns error if the network is unknown
    pub fn switch_network(&mut self, name: &str) -> ProbeResult<()> {
        let chain_id = self
            .networks
            .iter()
            .find(|n| n.name == name)
            .map(|n| n.chain_id)
            .ok_or_else(|| ProbeError::wallet("switch network", format!("unknown network '{name}'")))?;
        self.chain_id = chain_id;
        Ok(())
    }

    /// Import a token for the active account
    pub fn add_token(&mut self, token: &TokenDefinition) {
        self.account_mut().tokens.push(token.address.clone());
    }

    /// Derive an empty account
    pub fn create_account(&mut self) {
        self.accounts.push(Account::default());
    }

    /// Select an account by 1-based position
    ///
    /// # Errors
    ///
    /// Returns error if the account does not exist
    pub fn switch_account(&mut self, index: usize) -> ProbeResult<()> {
        if index == 0 || index > self.accounts.len() {
            return Err(ProbeError::wallet(
                "switch account",
                format!("no account {index}"),
            ));
        }
        self.active_account = index - 1;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Whether staging sales are listed
    #[must_use]
    pub const fn staging(&self) -> bool {
        self.staging
    }

    /// Whether the app holds a wallet connection
    #[must_use]
    pub const fn connected(&self) -> bool {
        self.connected
    }

    /// Outcome banner
    #[must_use]
    pub const fn status(&self) -> Option<PurchaseStatus> {
        self.status
    }

    /// Nodes bought this session
    #[must_use]
    pub const fn nodes_owned(&self) -> u64 {
        self.nodes_owned
    }

    /// Current field value
    #[must_use]
    pub fn amount(&self) -> &str {
        &self.amount
    }

    /// TUSD of the active account
    #[must_use]
    pub fn balance(&self) -> u64 {
        self.account().tusd
    }

    /// Whether the active account imported `token`
    #[must_use]
    pub fn has_token(&self, token: &TokenDefinition) -> bool {
        self.account()
            .tokens
            .iter()
            .any(|a| a.eq_ignore_ascii_case(&token.address))
    }

    /// Chain the extension points at
    #[must_use]
    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ready_app(funded: bool) -> SimulatedApp {
        let mut app = SimulatedApp::new(funded);
        app.add_network(&NetworkDefinition::arbitrum_sepolia()).unwrap();
        app.switch_network("Arbitrum Sepolia").unwrap();
        app.click("nav-settings").unwrap();
        app.click("staging-toggle").unwrap();
        app.click("nav-connect").unwrap();
        app.click("wallet-option-metamask").unwrap();
        app.wallet_approve().unwrap();
        app.click("sale-card").unwrap();
        app
    }

    fn enter(app: &mut SimulatedApp, amount: &str) {
        app.fill("amount", amount).unwrap();
    }

    mod normalization_tests {
        use super::*;

        #[test]
        fn test_examples() {
            assert_eq!(normalize_amount("1"), "1");
            assert_eq!(normalize_amount("1.5"), "1");
            assert_eq!(normalize_amount("-1"), "-1");
            assert_eq!(normalize_amount("abc"), "");
            assert_eq!(normalize_amount("@#$%"), "");
            assert_eq!(normalize_amount("-"), "");
            assert_eq!(normalize_amount("12abc"), "12");
        }

        proptest! {
            #[test]
            fn prop_result_is_empty_or_integer(raw in ".{0,16}") {
                let out = normalize_amount(&raw);
                prop_assert!(out.is_empty() || out.parse::<i64>().is_ok());
            }

            #[test]
            fn prop_letters_and_symbols_clear_the_field(raw in "[a-zA-Z@#$%^&*!?]{1,12}") {
                prop_assert_eq!(normalize_amount(&raw), "");
            }

            #[test]
            fn prop_decimals_truncate(whole in 0u32..10_000, frac in 1u32..1000) {
                let out = normalize_amount(&format!("{whole}.{frac}"));
                prop_assert_eq!(out, whole.to_string());
            }
        }
    }

    mod button_tests {
        use super::*;

        #[test]
        fn test_disconnected() {
            assert!(!SimulatedApp::default().action_button().1);
        }

        #[test]
        fn test_wrong_network() {
            let mut app = ready_app(true);
            app.chain_id = DEFAULT_CHAIN_ID;
            enter(&mut app, "1");
            assert_eq!(app.action_button(), ("Wrong Network", false));
        }

        #[test]
        fn test_non_positive_amounts() {
            let mut app = ready_app(true);
            for raw in ["0", "-1", "", "abc"] {
                enter(&mut app, raw);
                assert_eq!(app.action_button(), (ui::ENTER_AN_AMOUNT, false), "input {raw}");
            }
        }

        #[test]
        fn test_limit() {
            let mut app = ready_app(true);
            enter(&mut app, "600");
            assert_eq!(app.action_button(), (ui::EXCEEDED_PURCHASE_LIMIT, false));
            enter(&mut app, "599");
            assert_eq!(app.action_button(), (ui::APPROVE, true));
        }

        #[test]
        fn test_unfunded_account() {
            let mut app = ready_app(false);
            enter(&mut app, "1");
            assert_eq!(app.action_button(), (ui::INSUFFICIENT_BALANCE, false));
        }

        proptest! {
            #[test]
            fn prop_limit_boundary(q in 1i64..2_000) {
                let mut app = ready_app(true);
                enter(&mut app, &q.to_string());
                let (label, enabled) = app.action_button();
                if q >= ui::PURCHASE_LIMIT as i64 {
                    prop_assert_eq!(label, ui::EXCEEDED_PURCHASE_LIMIT);
                    prop_assert!(!enabled);
                } else {
                    prop_assert_eq!(label, ui::APPROVE);
                }
            }
        }
    }

    mod flow_tests {
        use super::*;

        fn approve_and_purchase(app: &mut SimulatedApp) {
            enter(app, "1");
            app.click("action-button").unwrap();
            assert_eq!(app.pending_request(), Some(WalletRequest::Allowance { amount: 1 }));
            app.wallet_sign().unwrap();
            assert_eq!(app.action_button(), (ui::PURCHASE, true));
            app.click("action-button").unwrap();
        }

        #[test]
        fn test_first_purchase_requires_terms_and_shows_share_dialog() {
            let mut app = ready_app(true);
            approve_and_purchase(&mut app);
            assert!(app.terms_open);
            app.click("terms-agree").unwrap();
            app.wallet_sign().unwrap();
            assert_eq!(app.status(), Some(PurchaseStatus::Purchased(1)));
            assert!(app.share_open);
            assert_eq!(app.balance(), FUNDED_BALANCE_TUSD - 1);
        }

        #[test]
        fn test_second_purchase_skips_terms_and_share_dialog() {
            let mut app = ready_app(true);
            approve_and_purchase(&mut app);
            app.click("terms-agree").unwrap();
            app.wallet_sign().unwrap();
            app.click("share-close").unwrap();

            approve_and_purchase(&mut app);
            assert!(!app.terms_open);
            assert_eq!(app.pending_request(), Some(WalletRequest::Purchase { quantity: 1 }));
            app.wallet_sign().unwrap();
            assert!(!app.share_open);
            assert_eq!(app.nodes_owned(), 2);
        }

        #[test]
        fn test_reject_shows_failure() {
            let mut app = ready_app(true);
            approve_and_purchase(&mut app);
            app.click("terms-agree").unwrap();
            app.wallet_reject().unwrap();
            assert_eq!(app.status(), Some(PurchaseStatus::Failed));
            assert_eq!(app.nodes_owned(), 0);
        }

        #[test]
        fn test_closing_wait_dialog_keeps_purchase_locked() {
            let mut app = ready_app(true);
            approve_and_purchase(&mut app);
            app.click("terms-agree").unwrap();
            app.click("dialog-close").unwrap();
            assert!(!app.waiting_open);
            assert_eq!(app.action_button(), (ui::PURCHASE, false));
        }

        #[test]
        fn test_closing_terms_cancels() {
            let mut app = ready_app(true);
            approve_and_purchase(&mut app);
            app.click("dialog-close").unwrap();
            assert!(!app.terms_open);
            assert!(app.pending_request().is_none());
            assert_eq!(app.action_button(), (ui::PURCHASE, true));
        }

        #[test]
        fn test_sign_without_request_fails() {
            let mut app = ready_app(true);
            assert!(app.wallet_sign().is_err());
            assert!(app.wallet_reject().is_err());
        }
    }

    mod extension_tests {
        use super::*;

        #[test]
        fn test_new_account_is_empty() {
            let mut app = ready_app(true);
            app.create_account();
            app.switch_account(2).unwrap();
            assert_eq!(app.balance(), 0);
            enter(&mut app, "1");
            assert_eq!(app.action_button(), (ui::INSUFFICIENT_BALANCE, false));
        }

        #[test]
        fn test_switch_unknown_network() {
            let mut app = SimulatedApp::default();
            assert!(app.switch_network("Nowhere").is_err());
        }

        #[test]
        fn test_token_is_per_account() {
            let mut app = SimulatedApp::default();
            app.add_token(&TokenDefinition::tusd());
            assert!(app.has_token(&TokenDefinition::tusd()));
            app.create_account();
            app.switch_account(2).unwrap();
            assert!(!app.has_token(&TokenDefinition::tusd()));
        }

        #[test]
        fn test_serves_app_url_only() {
            let app = SimulatedApp::default();
            assert!(app.serves("https://zerog-stg.netlify.app/"));
            assert!(app.serves("https://zerog-stg.netlify.app"));
            assert!(!app.serves("about:blank"));
        }
    }
}
