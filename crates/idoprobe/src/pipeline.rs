//! Scenarios as ordered step lists.
//!
//! A [`Pipeline`] is a list of [`Step`]s run against one [`Session`]. Before
//! anything runs, [`Pipeline::validate`] checks the ordering contract between
//! the helpers:
//!
//! - staging is enabled before connecting
//! - the wallet is connected before a purchase is initiated
//! - a purchase is initiated before approving or submitting it
//! - a purchase is submitted before agreeing, signing, rejecting or closing
//!   its dialog
//!
//! Steps are serde enums so scenarios can be written in YAML:
//!
//! ```yaml
//! - enable_staging
//! - connect_wallet
//! - initiate_purchase: { quantity: 600 }
//! - expect_disabled: { button: Exceeded Purchase Limit }
//! ```

use crate::config::SuiteConfig;
use crate::context::BrowserContext;
use crate::helpers;
use crate::locator::Locator;
use crate::optional::StepOutcome;
use crate::page::Page;
use crate::quantity::Quantity;
use crate::result::{ProbeError, ProbeResult};
use crate::ui;
use crate::wallet::WalletHandle;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element an assertion step looks at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Button by accessible name
    Button(String),
    /// Innermost element containing the text
    Text(String),
    /// Element by label
    Label(String),
    /// The "Token Amount" field
    AmountField,
    /// Any locator
    Locator(Locator),
}

impl Target {
    /// Locator for this target
    #[must_use]
    pub fn locator(&self) -> Locator {
        match self {
            Self::Button(name) => Locator::button(name.clone()),
            Self::Text(text) => Locator::text(text.clone()),
            Self::Label(label) => Locator::label(label.clone()),
            Self::AmountField => ui::token_amount(),
            Self::Locator(locator) => locator.clone(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.locator())
    }
}

/// One step of a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Reveal staging sales
    EnableStaging,
    /// Connect the wallet
    ConnectWallet,
    /// Connect unless already connected
    EnsureConnected,
    /// Open the sale card and type a quantity
    InitiatePurchase {
        /// Value typed into the amount field
        quantity: Quantity,
    },
    /// Approve the spending allowance if asked
    HandleApproval,
    /// Click the enabled Purchase button
    ClickPurchase,
    /// Accept the terms dialog if it shows
    AgreeIfPrompted,
    /// Accept the terms dialog
    Agree,
    /// Confirm the pending transaction in the wallet
    SignInWallet,
    /// Reject the pending transaction in the wallet
    RejectInWallet,
    /// Close the share dialog if it shows
    DismissShareDialogIfPresent,
    /// Close the purchase dialog
    CloseDialog,
    /// Derive a new wallet account
    CreateAccount,
    /// Select a wallet account (1-based)
    SwitchAccount {
        /// Account index
        index: usize,
    },
    /// Import the configured token for the active account
    AddToken,
    /// Bring the application's tab to the front
    FocusApp,
    /// Run `steps` `times` times
    Repeat {
        /// Iterations
        times: usize,
        /// Body
        steps: Vec<Step>,
    },
    /// Target is visible
    ExpectVisible(Target),
    /// Target is hidden or absent
    ExpectHidden(Target),
    /// Target is disabled
    ExpectDisabled(Target),
    /// Target is enabled
    ExpectEnabled(Target),
    /// Input has exactly this value
    ExpectValue {
        /// Input to read
        target: Target,
        /// Expected value
        value: String,
    },
    /// Input value parses as a whole number
    ExpectWholeNumber(Target),
    /// Target's text contains `text`
    ExpectText {
        /// Element to read
        target: Target,
        /// Expected substring
        text: String,
    },
}

impl Step {
    /// Short name for logs and errors
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EnableStaging => "enable_staging",
            Self::ConnectWallet => "connect_wallet",
            Self::EnsureConnected => "ensure_connected",
            Self::InitiatePurchase { .. } => "initiate_purchase",
            Self::HandleApproval => "handle_approval",
            Self::ClickPurchase => "click_purchase",
            Self::AgreeIfPrompted => "agree_if_prompted",
            Self::Agree => "agree",
            Self::SignInWallet => "sign_in_wallet",
            Self::RejectInWallet => "reject_in_wallet",
            Self::DismissShareDialogIfPresent => "dismiss_share_dialog_if_present",
            Self::CloseDialog => "close_dialog",
            Self::CreateAccount => "create_account",
            Self::SwitchAccount { .. } => "switch_account",
            Self::AddToken => "add_token",
            Self::FocusApp => "focus_app",
            Self::Repeat { .. } => "repeat",
            Self::ExpectVisible(_) => "expect_visible",
            Self::ExpectHidden(_) => "expect_hidden",
            Self::ExpectDisabled(_) => "expect_disabled",
            Self::ExpectEnabled(_) => "expect_enabled",
            Self::ExpectValue { .. } => "expect_value",
            Self::ExpectWholeNumber(_) => "expect_whole_number",
            Self::ExpectText { .. } => "expect_text",
        }
    }

    /// Whether this step only observes
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(
            self,
            Self::ExpectVisible(_)
                | Self::ExpectHidden(_)
                | Self::ExpectDisabled(_)
                | Self::ExpectEnabled(_)
                | Self::ExpectValue { .. }
                | Self::ExpectWholeNumber(_)
                | Self::ExpectText { .. }
        )
    }
}

/// Where the purchase flow stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    /// No wallet connection
    Disconnected,
    /// Wallet connected, nothing typed
    Connected,
    /// Quantity typed
    AmountEntered,
    /// The sale refuses the quantity; carries the button label
    Blocked(String),
    /// Approve clicked, allowance signature outstanding
    ApprovalPending,
    /// Allowance approved
    Approved,
    /// Purchase submitted, waiting on terms or signature
    ConfirmPending,
    /// Transaction signed
    Success,
    /// Transaction rejected
    Failure,
    /// Dialogs closed
    Idle,
}

impl Default for FlowState {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl FlowState {
    /// States entered while `step` ran, in order. Empty when nothing changed.
    #[must_use]
    pub fn path(&self, step: &Step, seen: &Observation) -> Vec<Self> {
        let skipped = seen.outcome == Some(StepOutcome::Skipped);
        match step {
            Step::ConnectWallet | Step::EnsureConnected if *self == Self::Disconnected => vec![Self::Connected],
            Step::InitiatePurchase { .. } => vec![Self::AmountEntered],
            Step::HandleApproval if *self == Self::AmountEntered => match (skipped, &seen.blocked_by) {
                (false, _) => vec![Self::ApprovalPending, Self::Approved],
                (true, Some(label)) => vec![Self::Blocked(label.clone())],
                (true, None) => Vec::new(),
            },
            Step::ClickPurchase => vec![Self::ConfirmPending],
            Step::SignInWallet => vec![Self::Success],
            Step::RejectInWallet => vec![Self::Failure],
            Step::CloseDialog => vec![Self::Idle],
            Step::DismissShareDialogIfPresent if !skipped || *self == Self::Success => vec![Self::Idle],
            Step::ExpectDisabled(Target::Button(label)) if *self == Self::AmountEntered => {
                vec![Self::Blocked(label.clone())]
            }
            _ => Vec::new(),
        }
    }

    /// State after `step` ran
    #[must_use]
    pub fn after(&self, step: &Step, seen: &Observation) -> Self {
        self.path(step, seen).pop().unwrap_or_else(|| self.clone())
    }
}

/// What a step saw while it ran
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    /// Outcome of an optional step; `None` for steps that always act
    pub outcome: Option<StepOutcome>,
    /// Label of the disabled action button, when one was read
    pub blocked_by: Option<String>,
}

impl Observation {
    /// An optional step finished with `outcome`
    #[must_use]
    pub const fn optional(outcome: StepOutcome) -> Self {
        Self {
            outcome: Some(outcome),
            blocked_by: None,
        }
    }

    /// Record the disabled action button's label
    #[must_use]
    pub fn with_blocked_by(mut self, label: Option<&str>) -> Self {
        self.blocked_by = label.map(str::to_string);
        self
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Progress {
    staging: bool,
    connected: bool,
    initiated: bool,
    submitted: bool,
}

fn invalid(index: usize, step: &Step, message: impl Into<String>) -> ProbeError {
    ProbeError::InvalidPipeline {
        index,
        step: step.name().to_string(),
        message: message.into(),
    }
}

fn check(progress: &mut Progress, index: usize, step: &Step) -> ProbeResult<()> {
    match step {
        Step::EnableStaging => progress.staging = true,
        Step::ConnectWallet | Step::EnsureConnected => {
            if !progress.staging {
                return Err(invalid(index, step, "staging mode must be enabled before connecting"));
            }
            progress.connected = true;
        }
        Step::InitiatePurchase { .. } => {
            if !progress.connected {
                return Err(invalid(index, step, "the wallet must be connected before a purchase"));
            }
            progress.initiated = true;
            progress.submitted = false;
        }
        Step::HandleApproval | Step::ClickPurchase => {
            if !progress.initiated {
                return Err(invalid(index, step, "no purchase has been initiated"));
            }
            if matches!(step, Step::ClickPurchase) {
                progress.submitted = true;
            }
        }
        Step::Agree
        | Step::AgreeIfPrompted
        | Step::SignInWallet
        | Step::RejectInWallet
        | Step::CloseDialog
        | Step::DismissShareDialogIfPresent => {
            if !progress.submitted {
                return Err(invalid(index, step, "the purchase has not been submitted"));
            }
        }
        Step::SwitchAccount { index: account } => {
            if *account == 0 {
                return Err(invalid(index, step, "accounts are numbered from 1"));
            }
        }
        Step::Repeat { times, steps } => {
            if *times == 0 || steps.is_empty() {
                return Err(invalid(index, step, "repeat needs at least one iteration and one step"));
            }
            for _ in 0..(*times).min(2) {
                for inner in steps {
                    check(progress, index, inner)?;
                }
            }
        }
        Step::CreateAccount | Step::AddToken | Step::FocusApp => {}
        Step::ExpectVisible(_)
        | Step::ExpectHidden(_)
        | Step::ExpectDisabled(_)
        | Step::ExpectEnabled(_)
        | Step::ExpectValue { .. }
        | Step::ExpectWholeNumber(_)
        | Step::ExpectText { .. } => {}
    }
    Ok(())
}

/// What a scenario works with
#[derive(Debug, Clone, Copy)]
pub struct Session<'a> {
    /// The application's tab
    pub page: &'a Page,
    /// The bootstrapped wallet
    pub wallet: &'a WalletHandle,
    /// The scenario's browser context
    pub context: &'a BrowserContext,
    /// Effective configuration
    pub config: &'a SuiteConfig,
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Steps executed, counting repeated bodies every time
    pub steps_run: usize,
    /// Flow state at the end
    pub state: FlowState,
    /// Every state entered, in order
    pub trail: Vec<FlowState>,
}

/// Ordered list of steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    #[serde(with = "serde_yaml_ng::with::singleton_map_recursive")]
    steps: Vec<Step>,
}

impl Pipeline {
    /// Pipeline over `steps`
    #[must_use]
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Append a step
    #[must_use]
    pub fn then(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Steps in order
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of top-level steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether there are no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check the ordering contract
    ///
    /// # Errors
    ///
    /// `InvalidPipeline` at the first step whose precondition is missing
    pub fn validate(&self) -> ProbeResult<()> {
        if self.steps.is_empty() {
            return Err(ProbeError::InvalidPipeline {
                index: 0,
                step: "-".to_string(),
                message: "pipeline has no steps".to_string(),
            });
        }
        let mut progress = Progress::default();
        for (index, step) in self.steps.iter().enumerate() {
            check(&mut progress, index, step)?;
        }
        Ok(())
    }

    /// Validate, then run every step in order. The first error stops the run.
    ///
    /// # Errors
    ///
    /// `InvalidPipeline`, or the first step's error
    pub async fn run(&self, session: Session<'_>) -> ProbeResult<RunReport> {
        self.validate()?;
        let mut report = RunReport {
            steps_run: 0,
            state: FlowState::default(),
            trail: Vec::new(),
        };
        for step in &self.steps {
            run_step(step, session, &mut report).await?;
        }
        Ok(report)
    }
}

fn run_step<'a: 'r, 'r>(
    step: &'a Step,
    session: Session<'a>,
    report: &'r mut RunReport,
) -> futures::future::BoxFuture<'r, ProbeResult<()>> {
    Box::pin(async move {
        if let Step::Repeat { times, steps } = step {
            for iteration in 0..*times {
                tracing::debug!(iteration, "repeat");
                for inner in steps {
                    run_step(inner, session, report).await?;
                }
            }
            return Ok(());
        }
        tracing::debug!(step = step.name(), state = ?report.state, "running step");
        let seen = execute(step, session).await?;
        report.steps_run += 1;
        let entered = report.state.path(step, &seen);
        if let Some(last) = entered.last() {
            report.state = last.clone();
        }
        report.trail.extend(entered);
        Ok(())
    })
}

async fn execute(step: &Step, s: Session<'_>) -> ProbeResult<Observation> {
    let page = s.page;
    match step {
        Step::EnsureConnected => helpers::ensure_connected(page, s.wallet).await.map(Observation::optional),
        Step::HandleApproval => {
            let outcome = helpers::handle_approval_if_present(page, s.wallet).await?;
            let blocked_by = if outcome.executed() {
                None
            } else {
                helpers::blocking_label(page).await?
            };
            Ok(Observation::optional(outcome).with_blocked_by(blocked_by))
        }
        Step::AgreeIfPrompted => helpers::agree_if_prompted(page).await.map(Observation::optional),
        Step::DismissShareDialogIfPresent => helpers::dismiss_share_dialog_if_present(page)
            .await
            .map(Observation::optional),
        other => act(other, s).await.map(|()| Observation::default()),
    }
}

async fn act(step: &Step, s: Session<'_>) -> ProbeResult<()> {
    let page = s.page;
    match step {
        Step::EnableStaging => helpers::enable_staging_mode(page, &s.config.staging_toggle).await,
        Step::ConnectWallet => helpers::connect_wallet(page, s.wallet).await,
        Step::InitiatePurchase { quantity } => helpers::initiate_purchase(page, quantity).await,
        Step::ClickPurchase => page.click(&ui::action_button(ui::PURCHASE)).await,
        Step::Agree => page.click(&ui::agree_button()).await,
        Step::SignInWallet => s.wallet.sign().await,
        Step::RejectInWallet => s.wallet.reject().await,
        Step::CloseDialog => page.click(&ui::close_dialog()).await,
        Step::CreateAccount => s.wallet.create_account().await.map(drop),
        Step::SwitchAccount { index } => s.wallet.switch_account(*index).await,
        Step::AddToken => s.wallet.add_token(&s.config.token).await,
        Step::FocusApp => {
            let host = s.config.app_host();
            let tab = s
                .context
                .find_page(host)
                .await?
                .ok_or_else(|| ProbeError::page(format!("no open tab shows {host}")))?;
            tab.bring_to_front().await
        }
        // optional steps go through `execute`; repeats never reach here
        Step::EnsureConnected
        | Step::HandleApproval
        | Step::AgreeIfPrompted
        | Step::DismissShareDialogIfPresent
        | Step::Repeat { .. } => Ok(()),
        Step::ExpectVisible(t) => page.expect(&t.locator()).to_be_visible().await,
        Step::ExpectHidden(t) => page.expect(&t.locator()).to_be_hidden().await,
        Step::ExpectDisabled(t) => page.expect(&t.locator()).to_be_disabled().await,
        Step::ExpectEnabled(t) => page.expect(&t.locator()).to_be_enabled().await,
        Step::ExpectValue { target, value } => page.expect(&target.locator()).to_have_value(value).await,
        Step::ExpectWholeNumber(t) => page.expect(&t.locator()).to_have_whole_number_value().await,
        Step::ExpectText { target, text } => page.expect(&target.locator()).to_contain_text(text).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn connected() -> Vec<Step> {
        vec![Step::EnableStaging, Step::ConnectWallet]
    }

    mod validation_tests {
        use super::*;

        #[test]
        fn test_empty_pipeline() {
            assert!(Pipeline::default().validate().is_err());
        }

        #[test]
        fn test_connect_before_staging() {
            let err = Pipeline::new(vec![Step::ConnectWallet]).validate().unwrap_err();
            match err {
                ProbeError::InvalidPipeline { index, step, .. } => {
                    assert_eq!(index, 0);
                    assert_eq!(step, "connect_wallet");
                }
                other => panic!("unexpected {other}"),
            }
        }

        #[test]
        fn test_purchase_before_connect() {
            let pipeline = Pipeline::new(vec![
                Step::EnableStaging,
                Step::InitiatePurchase { quantity: 1.into() },
            ]);
            assert!(pipeline.validate().unwrap_err().to_string().contains("connected"));
        }

        #[test]
        fn test_sign_before_submit() {
            let mut steps = connected();
            steps.push(Step::InitiatePurchase { quantity: 1.into() });
            steps.push(Step::SignInWallet);
            let err = Pipeline::new(steps).validate().unwrap_err();
            assert!(matches!(err, ProbeError::InvalidPipeline { index: 3, .. }));
        }

        #[test]
        fn test_new_purchase_resets_submission() {
            let mut steps = connected();
            steps.extend([
                Step::InitiatePurchase { quantity: 1.into() },
                Step::ClickPurchase,
                Step::InitiatePurchase { quantity: 1.into() },
                Step::RejectInWallet,
            ]);
            assert!(Pipeline::new(steps).validate().is_err());
        }

        #[test]
        fn test_repeat_body_checked() {
            let mut steps = connected();
            steps.push(Step::Repeat {
                times: 2,
                steps: vec![
                    Step::InitiatePurchase { quantity: 1.into() },
                    Step::HandleApproval,
                    Step::ClickPurchase,
                    Step::AgreeIfPrompted,
                    Step::SignInWallet,
                ],
            });
            Pipeline::new(steps).validate().unwrap();
        }

        #[test]
        fn test_empty_repeat_rejected() {
            let mut steps = connected();
            steps.push(Step::Repeat { times: 0, steps: vec![Step::ConnectWallet] });
            assert!(Pipeline::new(steps).validate().is_err());
        }

        #[test]
        fn test_account_zero_rejected() {
            let pipeline = Pipeline::new(vec![Step::SwitchAccount { index: 0 }]);
            assert!(pipeline.validate().is_err());
        }

        #[test]
        fn test_wallet_steps_allowed_before_staging() {
            let mut steps = vec![Step::CreateAccount, Step::SwitchAccount { index: 2 }, Step::AddToken, Step::FocusApp];
            steps.extend(connected());
            Pipeline::new(steps).validate().unwrap();
        }
    }

    mod flow_state_tests {
        use super::*;

        fn acted() -> Observation {
            Observation::default()
        }

        #[test]
        fn test_happy_path() {
            let steps = [
                (Step::ConnectWallet, acted()),
                (Step::InitiatePurchase { quantity: 1.into() }, acted()),
                (Step::HandleApproval, Observation::optional(StepOutcome::Executed)),
                (Step::ClickPurchase, acted()),
                (Step::SignInWallet, acted()),
                (Step::DismissShareDialogIfPresent, Observation::optional(StepOutcome::Executed)),
            ];
            let mut state = FlowState::default();
            let mut trail = Vec::new();
            for (step, seen) in &steps {
                let entered = state.path(step, seen);
                state = state.after(step, seen);
                trail.extend(entered);
            }
            assert_eq!(
                trail,
                vec![
                    FlowState::Connected,
                    FlowState::AmountEntered,
                    FlowState::ApprovalPending,
                    FlowState::Approved,
                    FlowState::ConfirmPending,
                    FlowState::Success,
                    FlowState::Idle,
                ]
            );
            assert_eq!(state, FlowState::Idle);
        }

        #[test]
        fn test_skipped_approval_keeps_amount() {
            let seen = Observation::optional(StepOutcome::Skipped);
            assert_eq!(FlowState::AmountEntered.after(&Step::HandleApproval, &seen), FlowState::AmountEntered);
        }

        #[test]
        fn test_skipped_approval_on_refusal_blocks() {
            let seen = Observation::optional(StepOutcome::Skipped).with_blocked_by(Some(ui::INSUFFICIENT_BALANCE));
            assert_eq!(
                FlowState::AmountEntered.after(&Step::HandleApproval, &seen),
                FlowState::Blocked(ui::INSUFFICIENT_BALANCE.into())
            );
        }

        #[test]
        fn test_blocked_by_assertion() {
            let state = FlowState::AmountEntered.after(
                &Step::ExpectDisabled(Target::Button(ui::EXCEEDED_PURCHASE_LIMIT.into())),
                &acted(),
            );
            assert_eq!(state, FlowState::Blocked(ui::EXCEEDED_PURCHASE_LIMIT.into()));
        }

        #[test]
        fn test_rejection() {
            assert_eq!(FlowState::ConfirmPending.after(&Step::RejectInWallet, &acted()), FlowState::Failure);
        }

        #[test]
        fn test_share_dialog_absent_after_repeat_success() {
            let seen = Observation::optional(StepOutcome::Skipped);
            assert_eq!(FlowState::Success.after(&Step::DismissShareDialogIfPresent, &seen), FlowState::Idle);
            assert_eq!(
                FlowState::ConfirmPending.after(&Step::DismissShareDialogIfPresent, &seen),
                FlowState::ConfirmPending
            );
        }
    }

    mod run_tests {
        use super::*;
        use crate::bootstrap::{bootstrap_wallet, BootstrapConfig, SeedPhrase, HARDHAT_MNEMONIC};
        use crate::chain::{NetworkDefinition, TokenDefinition};
        use crate::mock::SimulatedBackend;
        use crate::wait::Timeouts;

        async fn run_with_seed(seed: &str, steps: Vec<Step>) -> RunReport {
            let config = SuiteConfig {
                timeouts: Timeouts::fast(),
                ..SuiteConfig::default()
            };
            let boot_config = BootstrapConfig::new(SeedPhrase::parse(seed).unwrap()).with_timeouts(Timeouts::fast());
            let boot = bootstrap_wallet(&SimulatedBackend::new(), &boot_config).await.unwrap();
            helpers::configure_network(&boot.wallet, &NetworkDefinition::arbitrum_sepolia(), &TokenDefinition::tusd())
                .await
                .unwrap();
            let page = boot.context.new_page().await.unwrap();
            page.goto(&config.app_url).await.unwrap();
            let session = Session {
                page: &page,
                wallet: &boot.wallet,
                context: &boot.context,
                config: &config,
            };
            let report = Pipeline::new(steps).run(session).await.unwrap();
            boot.context.close().await.unwrap();
            report
        }

        fn approval_steps() -> Vec<Step> {
            let mut steps = connected();
            steps.extend([Step::InitiatePurchase { quantity: 1.into() }, Step::HandleApproval]);
            steps
        }

        #[tokio::test]
        async fn test_unfunded_approval_reports_blocked() {
            let report = run_with_seed(HARDHAT_MNEMONIC, approval_steps()).await;
            assert_eq!(report.state, FlowState::Blocked(ui::INSUFFICIENT_BALANCE.into()));
            assert!(!report.trail.contains(&FlowState::Approved));
        }

        #[tokio::test]
        async fn test_funded_approval_passes_through_pending() {
            let funded = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
            let report = run_with_seed(funded, approval_steps()).await;
            assert_eq!(report.state, FlowState::Approved);
            assert_eq!(
                report.trail,
                vec![
                    FlowState::Connected,
                    FlowState::AmountEntered,
                    FlowState::ApprovalPending,
                    FlowState::Approved,
                ]
            );
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_yaml_steps() {
            let yaml = r#"
- enable_staging
- connect_wallet
- initiate_purchase: { quantity: 600 }
- expect_disabled: { button: Exceeded Purchase Limit }
- expect_value: { target: amount_field, value: "600" }
- repeat:
    times: 2
    steps: [handle_approval]
"#;
            let pipeline: Pipeline = serde_yaml_ng::from_str(yaml).unwrap();
            assert_eq!(pipeline.len(), 6);
            assert_eq!(pipeline.steps()[2], Step::InitiatePurchase { quantity: Quantity::Int(600) });
            assert_eq!(
                pipeline.steps()[3],
                Step::ExpectDisabled(Target::Button("Exceeded Purchase Limit".into()))
            );
            assert_eq!(
                pipeline.steps()[4],
                Step::ExpectValue {
                    target: Target::AmountField,
                    value: "600".into()
                }
            );
        }

        #[test]
        fn test_unknown_step_rejected() {
            assert!(serde_yaml_ng::from_str::<Pipeline>("- teleport\n").is_err());
        }

        #[test]
        fn test_target_locators() {
            assert_eq!(Target::Button("Agree".into()).to_string(), "role=button[name=\"Agree\"i]");
            assert_eq!(Target::AmountField.locator(), ui::token_amount());
        }
    }
}
