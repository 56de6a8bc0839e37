//! In-process simulation of the sale application and the wallet extension.
//!
//! The simulator implements the same driver traits as the Chromium backend,
//! so helpers, pipelines and the runner are exercised end to end without a
//! browser:
//!
//! ```rust,ignore
//! use idoprobe::mock::SimulatedBackend;
//! use idoprobe::{ScenarioRunner, SuiteConfig};
//! use std::sync::Arc;
//!
//! let runner = ScenarioRunner::new(Arc::new(SimulatedBackend::new()), config);
//! let results = runner.run("simulated", &idoprobe::catalog()).await;
//! assert!(results.all_passed());
//! ```

pub mod app;
pub mod backend;
pub mod dom;
pub mod strategies;
pub mod wallet;

pub use app::{
    normalize_amount, PurchaseStatus, SharedApp, SimulatedApp, WalletRequest, FUNDED_BALANCE_TUSD,
    NODE_PRICE_TUSD,
};
pub use backend::{SimulatedBackend, SimulatedContext, SimulatedPage, EXTENSION_HOME_URL};
pub use dom::{Dom, Node};
#[cfg(feature = "proptest")]
pub use strategies::{
    any_quantity, fractional_quantity, non_numeric_quantity, non_positive_quantity,
    over_limit_quantity,
};
pub use strategies::{edge_case_quantities, purchasable_quantities};
pub use wallet::SimulatedWallet;
