//! Risk-factor gradients.
//!
//! A [`RiskFactorGradient`] is the one-time (algorithmic-differentiation)
//! gradient of a product value with respect to the model's native risk
//! factors: forward rates on the tenor grid and discount-curve pillar
//! factors. It is computed once per product per lifecycle phase and then
//! consumed by the forward sensitivity transformation at every evaluation
//! time.
//!
//! Lookups of factors the product does not depend on yield zero, never an
//! error; SIMM treats absent sensitivities as non-material.

use std::collections::HashMap;

use simm_core::PathValue;

/// Identifier of a native model risk factor.
///
/// The differentiation engine keys its gradient by these factors; they
/// replace opaque AD node ids with a closed, value-equal key space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RiskFactorKey {
    /// The forward rate spanning `[t_i, t_{i+1}]` on the native tenor grid,
    /// identified by its grid index `i`.
    Forward {
        /// Index on the native tenor grid.
        grid_index: usize,
    },
    /// A discount-curve pillar factor, identified by its pillar index.
    DiscountPillar {
        /// Index into the curve's pillar times.
        pillar_index: usize,
    },
}

/// Gradient of a scalar product value with respect to native risk factors,
/// one path-wise partial derivative per factor.
#[derive(Clone, Debug, Default)]
pub struct RiskFactorGradient {
    entries: HashMap<RiskFactorKey, PathValue>,
}

impl RiskFactorGradient {
    /// Creates an empty gradient.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a contribution to a factor's partial derivative.
    ///
    /// Multiple contributions to the same factor accumulate, as when two
    /// swap periods share a fixing.
    pub fn accumulate(&mut self, key: RiskFactorKey, value: PathValue) {
        self.entries
            .entry(key)
            .and_modify(|existing| *existing = &*existing + &value)
            .or_insert(value);
    }

    /// Partial derivative with respect to a factor; zero if the product has
    /// no dependency on it.
    pub fn derivative(&self, key: &RiskFactorKey) -> PathValue {
        self.entries.get(key).cloned().unwrap_or_else(PathValue::zero)
    }

    /// Whether the gradient has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of factors with a recorded dependency.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_missing_factor_is_zero() {
        let gradient = RiskFactorGradient::new();
        let dv = gradient.derivative(&RiskFactorKey::Forward { grid_index: 3 });
        assert_relative_eq!(dv.average(), 0.0);
    }

    #[test]
    fn test_accumulate_adds() {
        let mut gradient = RiskFactorGradient::new();
        let key = RiskFactorKey::DiscountPillar { pillar_index: 1 };
        gradient.accumulate(key, PathValue::constant(0.5));
        gradient.accumulate(key, PathValue::constant(0.25));
        assert_relative_eq!(gradient.derivative(&key).average(), 0.75);
        assert_eq!(gradient.len(), 1);
    }

    #[test]
    fn test_keys_are_value_equal() {
        let a = RiskFactorKey::Forward { grid_index: 2 };
        let b = RiskFactorKey::Forward { grid_index: 2 };
        assert_eq!(a, b);
        assert_ne!(a, RiskFactorKey::DiscountPillar { pillar_index: 2 });
    }
}
