//! Interaction helpers shared by every scenario.
//!
//! Each helper is one step of the purchase flow. They are meant to be called
//! in this order, and nothing here checks that; [`crate::Pipeline::validate`]
//! does:
//!
//! 1. [`configure_network`] once per wallet, right after bootstrap
//! 2. [`enable_staging_mode`] before anything touches the sale
//! 3. [`connect_wallet`] (or [`ensure_connected`])
//! 4. [`initiate_purchase`]
//! 5. [`handle_approval_if_present`]
//!
//! Helpers never assert on outcomes and never swallow errors.

use crate::chain::{NetworkDefinition, TokenDefinition};
use crate::config::StagingToggle;
use crate::optional::{OptionalStep, StepOutcome};
use crate::page::Page;
use crate::quantity::Quantity;
use crate::result::{ProbeError, ProbeResult};
use crate::ui;
use crate::wallet::WalletHandle;

fn setup_stage(stage: &'static str) -> impl FnOnce(ProbeError) -> ProbeError {
    move |e| {
        if e.is_setup_failure() {
            e
        } else {
            ProbeError::setup(stage, e.to_string())
        }
    }
}

/// Add `network`, switch to it, then import `token`. Order matters: the
/// token lives on that network.
///
/// # Errors
///
/// `Setup` naming the stage that failed
pub async fn configure_network(
    wallet: &WalletHandle,
    network: &NetworkDefinition,
    token: &TokenDefinition,
) -> ProbeResult<()> {
    tracing::info!(network = %network.name, chain_id = network.chain_id, token = %token.symbol, "configuring wallet network");
    wallet.add_network(network).await.map_err(setup_stage("add network"))?;
    wallet
        .switch_network(&network.name)
        .await
        .map_err(setup_stage("switch network"))?;
    wallet.add_token(token).await.map_err(setup_stage("add token"))?;
    Ok(())
}

/// Reveal staging sales: open the staging menu and check its checkbox
///
/// # Errors
///
/// `InteractionTimeout` if either control never becomes actionable
pub async fn enable_staging_mode(page: &Page, toggle: &StagingToggle) -> ProbeResult<()> {
    tracing::info!("enabling staging mode");
    page.click(&toggle.opener()).await?;
    page.check(&toggle.checkbox()).await
}

/// Open the wallet picker, choose MetaMask and approve in the extension
///
/// # Errors
///
/// `InteractionTimeout` if a control or the extension prompt never shows up
pub async fn connect_wallet(page: &Page, wallet: &WalletHandle) -> ProbeResult<()> {
    tracing::info!("connecting wallet");
    page.click(&ui::connect_wallet_button()).await?;
    page.click(&ui::metamask_option()).await?;
    wallet.approve().await
}

/// [`connect_wallet`] unless the app already shows a connected state
///
/// # Errors
///
/// As [`connect_wallet`]
pub async fn ensure_connected(page: &Page, wallet: &WalletHandle) -> ProbeResult<StepOutcome> {
    OptionalStep::new("connect wallet", ui::connect_wallet_button())
        .run(page, move || async move { connect_wallet(page, wallet).await })
        .await
}

/// Open the sale card and type `quantity` into the amount field, verbatim
///
/// # Errors
///
/// `InteractionTimeout` if the card or field never becomes usable
pub async fn initiate_purchase(page: &Page, quantity: &Quantity) -> ProbeResult<()> {
    let input = quantity.as_input();
    tracing::info!(quantity = %input, "initiating purchase");
    page.click(&ui::sale_card()).await?;
    page.fill(&ui::token_amount(), &input).await
}

/// If the sale asks for a spending allowance, approve it and sign
///
/// # Errors
///
/// Errors from clicking or signing. Absence of the Approve button is not one.
pub async fn handle_approval_if_present(page: &Page, wallet: &WalletHandle) -> ProbeResult<StepOutcome> {
    let approve = &ui::action_button(ui::APPROVE);
    OptionalStep::new("token approval", approve.clone())
        .run(page, move || async move {
            page.click(approve).await?;
            wallet.sign().await
        })
        .await
}

/// Label of the action button when it is disabled with a refusal, read
/// once without waiting
///
/// # Errors
///
/// Only driver failures
pub async fn blocking_label(page: &Page) -> ProbeResult<Option<&'static str>> {
    for label in ui::BLOCKING_LABELS {
        let states = page.driver().inspect(&ui::action_button(label)).await?;
        if states.first().is_some_and(|s| s.visible && !s.enabled) {
            return Ok(Some(label));
        }
    }
    Ok(None)
}

/// Accept the first-time terms dialog if it is showing
///
/// # Errors
///
/// Errors from clicking Agree
pub async fn agree_if_prompted(page: &Page) -> ProbeResult<StepOutcome> {
    let agree = &ui::agree_button();
    OptionalStep::new("agree to terms", agree.clone())
        .run(page, move || async move { page.click(agree).await })
        .await
}

/// Close the first-success share dialog if it is showing
///
/// # Errors
///
/// Errors from clicking the close control
pub async fn dismiss_share_dialog_if_present(page: &Page) -> ProbeResult<StepOutcome> {
    let close = &ui::share_dialog_close();
    OptionalStep::new("share dialog", close.clone())
        .run(page, move || async move { page.click(close).await })
        .await
}
