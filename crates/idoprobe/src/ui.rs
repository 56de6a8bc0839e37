//! The application's UI contract: the texts, labels and test ids the
//! helpers rely on, and the locators built from them.

use crate::locator::Locator;

/// Staging deployment of the sale application
pub const APP_URL: &str = "https://zerog-stg.netlify.app/";

/// Navigation button that opens the wallet picker
pub const CONNECT_WALLET: &str = "Connect Wallet";
/// `data-testid` of the MetaMask option in the wallet picker
pub const METAMASK_OPTION_TEST_ID: &str = "rk-wallet-option-metaMask";
/// Label of the staging checkbox
pub const STAGING_CHECKBOX: &str = "Staging IDO";
/// Sale card opened before entering an amount
pub const SALE_CARD: &str = "1 Test Sales Interview";
/// Accessible name of the amount field
pub const TOKEN_AMOUNT: &str = "Token Amount";

/// Action button: allowance needed
pub const APPROVE: &str = "Approve";
/// Action button: ready to buy
pub const PURCHASE: &str = "Purchase";
/// Action button: quantity is zero, negative or missing
pub const ENTER_AN_AMOUNT: &str = "Enter an amount";
/// Action button: quantity at or above the limit
pub const EXCEEDED_PURCHASE_LIMIT: &str = "Exceeded Purchase Limit";
/// Action button: not enough TUSD
pub const INSUFFICIENT_BALANCE: &str = "Insufficient TUSD Balance";

/// Labels the action button shows while it refuses the amount
pub const BLOCKING_LABELS: [&str; 3] = [ENTER_AN_AMOUNT, EXCEEDED_PURCHASE_LIMIT, INSUFFICIENT_BALANCE];

/// Title of the first-time terms dialog
pub const CONFIRM_PURCHASE: &str = "Confirm Purchase";
/// Title of the dialog shown while the wallet is asked to sign
pub const WAITING_FOR_SIGNATURE: &str = "Waiting for wallet signature";
/// Terms dialog confirmation
pub const AGREE: &str = "Agree";
/// `aria-label` of the purchase dialogs' close control
pub const CLOSE_DIALOG_LABEL: &str = "Close the dialog";
/// Header of the first-success share dialog
pub const SHARE_DIALOG_TITLE: &str = "Share to earn rewards";
/// Banner after a rejected purchase
pub const PURCHASE_FAILED: &str = "Your recent purchase attempt was unsuccessful";

/// Quantities at or above this are refused
pub const PURCHASE_LIMIT: u64 = 600;

/// Banner after a confirmed purchase
#[must_use]
pub fn purchased_text(quantity: u64) -> String {
    format!("Purchased {quantity} NODE")
}

/// The navigation region
#[must_use]
pub fn navigation() -> Locator {
    Locator::role("navigation")
}

/// "Connect Wallet", scoped to the navigation region
#[must_use]
pub fn connect_wallet_button() -> Locator {
    navigation().child(Locator::button(CONNECT_WALLET))
}

/// MetaMask entry of the wallet picker
#[must_use]
pub fn metamask_option() -> Locator {
    Locator::test_id(METAMASK_OPTION_TEST_ID)
}

/// Sale card
#[must_use]
pub fn sale_card() -> Locator {
    Locator::button(SALE_CARD)
}

/// Amount field
#[must_use]
pub fn token_amount() -> Locator {
    Locator::role("textbox").with_name(TOKEN_AMOUNT)
}

/// Action button while it reads `label`
#[must_use]
pub fn action_button(label: &str) -> Locator {
    Locator::button(label)
}

/// Terms dialog confirmation
#[must_use]
pub fn agree_button() -> Locator {
    Locator::button(AGREE)
}

/// Close control of the terms and pending-signature dialogs
#[must_use]
pub fn close_dialog() -> Locator {
    Locator::label(CLOSE_DIALOG_LABEL)
}

/// Close control of the share dialog: the button inside the block whose
/// whole text is the dialog title
#[must_use]
pub fn share_dialog_close() -> Locator {
    Locator::css("div")
        .filter_has_text(SHARE_DIALOG_TITLE)
        .child(Locator::role("button"))
}
