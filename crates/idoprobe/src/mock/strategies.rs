//! Quantity inputs for exercising the sale widget.
//!
//! The fixed lists are always available. The proptest strategies need the
//! `proptest` feature outside this crate's own tests.
//!
//! ```rust,ignore
//! proptest! {
//!     #[test]
//!     fn prop_over_limit_is_refused(q in over_limit_quantity()) {
//!         // drive the simulated sale with `q` and expect the disabled button
//!     }
//! }
//! ```

use crate::quantity::Quantity;
use crate::ui;

#[cfg(any(test, feature = "proptest"))]
use proptest::prelude::*;

/// Inputs the original suite checks, with the action-button label each
/// must produce (`None` means the field must end up empty)
#[must_use]
pub fn edge_case_quantities() -> Vec<(Quantity, Option<&'static str>)> {
    vec![
        (Quantity::Int(0), Some(ui::ENTER_AN_AMOUNT)),
        (Quantity::Int(-1), Some(ui::ENTER_AN_AMOUNT)),
        (Quantity::Int(ui::PURCHASE_LIMIT as i64), Some(ui::EXCEEDED_PURCHASE_LIMIT)),
        (Quantity::from("abc"), None),
        (Quantity::from("@#$%"), None),
    ]
}

/// Quantities a funded account can buy
#[must_use]
pub fn purchasable_quantities() -> Vec<Quantity> {
    vec![Quantity::Int(1), Quantity::Int(2), Quantity::Int(ui::PURCHASE_LIMIT as i64 - 1)]
}

/// Zero and negative integers
#[cfg(any(test, feature = "proptest"))]
pub fn non_positive_quantity() -> impl Strategy<Value = Quantity> {
    (-100_000i64..=0).prop_map(Quantity::Int)
}

/// Integers at or above the purchase limit
#[cfg(any(test, feature = "proptest"))]
pub fn over_limit_quantity() -> impl Strategy<Value = Quantity> {
    (ui::PURCHASE_LIMIT as i64..1_000_000).prop_map(Quantity::Int)
}

/// Text with no digit, sign or point in it
#[cfg(any(test, feature = "proptest"))]
pub fn non_numeric_quantity() -> impl Strategy<Value = Quantity> {
    "[a-zA-Z@#$%^&*!?_ ]{1,16}".prop_map(Quantity::Text)
}

/// Decimals strictly between 1 and the limit
#[cfg(any(test, feature = "proptest"))]
pub fn fractional_quantity() -> impl Strategy<Value = Quantity> {
    (1u32..ui::PURCHASE_LIMIT as u32, 1u32..1000)
        .prop_map(|(whole, frac)| Quantity::Decimal(f64::from(whole) + f64::from(frac) / 1000.0))
}

/// Any input, valid or not
#[cfg(any(test, feature = "proptest"))]
pub fn any_quantity() -> impl Strategy<Value = Quantity> {
    prop_oneof![
        any::<i64>().prop_map(Quantity::Int),
        fractional_quantity(),
        non_numeric_quantity(),
        ".{0,12}".prop_map(Quantity::Text),
    ]
}
