//! Purchase quantities.
//!
//! A quantity is whatever a user might type into the amount field. The helper
//! layer forwards its string form untouched; deciding what is valid is the
//! application's job, and asserting on it is the scenario's.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value typed into the "Token Amount" field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    /// Integer amount, possibly zero or negative
    Int(i64),
    /// Fractional amount
    Decimal(f64),
    /// Arbitrary text
    Text(String),
}

impl Quantity {
    /// String form forwarded to the field
    #[must_use]
    pub fn as_input(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Decimal(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Quantity {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Quantity {
    fn from(x: f64) -> Self {
        Self::Decimal(x)
    }
}

impl From<&str> for Quantity {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}
