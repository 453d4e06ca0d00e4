//! Regulatory vocabulary shared across the workspace.
//!
//! These are closed enums with value equality. The pipeline never compares
//! risk classes or curve names as strings.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// SIMM risk class.
///
/// Only [`RiskClass::InterestRate`] currently produces delta sensitivities;
/// the remaining classes exist so that requests for them resolve to a zero
/// (non-material) sensitivity rather than an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RiskClass {
    /// Interest rate delta (swap-rate pillars per currency).
    InterestRate,
    /// Qualifying credit.
    CreditQ,
    /// Non-qualifying credit.
    CreditNonQ,
    /// Foreign exchange.
    Fx,
    /// Equity.
    Equity,
    /// Commodity.
    Commodity,
}

impl fmt::Display for RiskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskClass::InterestRate => "InterestRate",
            RiskClass::CreditQ => "CreditQ",
            RiskClass::CreditNonQ => "CreditNonQ",
            RiskClass::Fx => "FX",
            RiskClass::Equity => "Equity",
            RiskClass::Commodity => "Commodity",
        };
        write!(f, "{}", name)
    }
}

/// Market curve a sensitivity is expressed against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CurveKey {
    /// The OIS discount curve. Sensitivities flow through discount-factor
    /// pillars rather than forward rates.
    Ois,
    /// A forward (projection) curve with the given tenor in months.
    Forward {
        /// Index tenor in months (e.g. 6 for a 6m Libor-style index).
        tenor_months: u32,
    },
}

impl CurveKey {
    /// The 6m forward curve, the default index of the reference products.
    pub const FORWARD_6M: CurveKey = CurveKey::Forward { tenor_months: 6 };

    /// Whether this is the discount curve.
    pub fn is_discount(&self) -> bool {
        matches!(self, CurveKey::Ois)
    }
}

impl fmt::Display for CurveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurveKey::Ois => write!(f, "OIS"),
            CurveKey::Forward { tenor_months } => write!(f, "Forward{}m", tenor_months),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_class_value_equality() {
        assert_eq!(RiskClass::InterestRate, RiskClass::InterestRate);
        assert_ne!(RiskClass::InterestRate, RiskClass::CreditQ);
    }

    #[test]
    fn test_curve_key_display() {
        assert_eq!(CurveKey::Ois.to_string(), "OIS");
        assert_eq!(CurveKey::FORWARD_6M.to_string(), "Forward6m");
    }

    #[test]
    fn test_is_discount() {
        assert!(CurveKey::Ois.is_discount());
        assert!(!CurveKey::FORWARD_6M.is_discount());
    }
}
