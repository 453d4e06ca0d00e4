//! Path-wise Monte Carlo values.
//!
//! A [`PathValue`] carries one scalar per simulated path. Deterministic
//! quantities are stored as a broadcastable constant so that curve data and
//! indicator masks do not allocate a full path vector.

use std::ops::{Add, Div, Mul, Neg, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A value represented as one scalar per Monte Carlo path.
///
/// Arithmetic between two stochastic values requires identical path counts;
/// a constant broadcasts against any path count. All operations are
/// element-wise across paths.
///
/// # Examples
///
/// ```
/// use simm_core::PathValue;
///
/// let a = PathValue::from_values(vec![1.0, 2.0, 3.0]);
/// let b = PathValue::constant(0.5);
/// let sum = &a + &b;
/// assert_eq!(sum.get(1), 2.5);
/// ```
///
/// # Panics
///
/// Binary operations panic if both operands are stochastic with different
/// path counts. Shape agreement is a structural invariant of the engine,
/// not a runtime condition.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PathValue {
    /// A deterministic value, identical on every path.
    Constant(f64),
    /// A stochastic value with one entry per path.
    Stochastic(Vec<f64>),
}

impl PathValue {
    /// Creates a deterministic (broadcast) value.
    pub fn constant(value: f64) -> Self {
        PathValue::Constant(value)
    }

    /// Creates a stochastic value from per-path realisations.
    pub fn from_values(values: Vec<f64>) -> Self {
        PathValue::Stochastic(values)
    }

    /// The additive identity.
    pub fn zero() -> Self {
        PathValue::Constant(0.0)
    }

    /// Number of paths, or `None` for a broadcastable constant.
    pub fn num_paths(&self) -> Option<usize> {
        match self {
            PathValue::Constant(_) => None,
            PathValue::Stochastic(values) => Some(values.len()),
        }
    }

    /// Whether this value is deterministic.
    pub fn is_constant(&self) -> bool {
        matches!(self, PathValue::Constant(_))
    }

    /// Realisation on a given path. Constants ignore the path index.
    pub fn get(&self, path: usize) -> f64 {
        match self {
            PathValue::Constant(value) => *value,
            PathValue::Stochastic(values) => values[path],
        }
    }

    /// Materialises the value as a dense per-path vector.
    pub fn to_vec(&self, num_paths: usize) -> Vec<f64> {
        match self {
            PathValue::Constant(value) => vec![*value; num_paths],
            PathValue::Stochastic(values) => {
                debug_assert_eq!(values.len(), num_paths);
                values.clone()
            }
        }
    }

    /// Cross-path average (expectation under the empirical measure).
    pub fn average(&self) -> f64 {
        match self {
            PathValue::Constant(value) => *value,
            PathValue::Stochastic(values) => {
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            }
        }
    }

    /// `self + a * b`, the fused form used by matrix composition.
    pub fn add_product(&self, a: &PathValue, b: &PathValue) -> PathValue {
        self + &(a * b)
    }

    /// Path-wise reciprocal.
    pub fn invert(&self) -> PathValue {
        self.map(|x| 1.0 / x)
    }

    /// Path-wise power with a deterministic exponent.
    pub fn pow(&self, exponent: f64) -> PathValue {
        self.map(|x| x.powf(exponent))
    }

    /// Path-wise exponential.
    pub fn exp(&self) -> PathValue {
        self.map(f64::exp)
    }

    /// Path-wise natural logarithm.
    pub fn ln(&self) -> PathValue {
        self.map(f64::ln)
    }

    /// Path-wise absolute value.
    pub fn abs(&self) -> PathValue {
        self.map(f64::abs)
    }

    /// Path-wise barrier selection: where `self >= 0` take
    /// `if_nonnegative`, otherwise `if_negative`.
    ///
    /// This is the indicator primitive used for exercise masking and
    /// survival indicators.
    pub fn choose(&self, if_nonnegative: &PathValue, if_negative: &PathValue) -> PathValue {
        match self {
            PathValue::Constant(trigger) => {
                if *trigger >= 0.0 {
                    if_nonnegative.clone()
                } else {
                    if_negative.clone()
                }
            }
            PathValue::Stochastic(triggers) => {
                let values = triggers
                    .iter()
                    .enumerate()
                    .map(|(path, trigger)| {
                        if *trigger >= 0.0 {
                            if_nonnegative.get(path)
                        } else {
                            if_negative.get(path)
                        }
                    })
                    .collect();
                PathValue::Stochastic(values)
            }
        }
    }

    /// Minimum realisation across paths.
    pub fn min(&self) -> f64 {
        match self {
            PathValue::Constant(value) => *value,
            PathValue::Stochastic(values) => values.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }

    /// Applies a scalar function on every path.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> PathValue {
        match self {
            PathValue::Constant(value) => PathValue::Constant(f(*value)),
            PathValue::Stochastic(values) => {
                PathValue::Stochastic(values.iter().map(|x| f(*x)).collect())
            }
        }
    }

    /// Combines two values element-wise.
    fn zip_with(&self, other: &PathValue, f: impl Fn(f64, f64) -> f64) -> PathValue {
        match (self, other) {
            (PathValue::Constant(a), PathValue::Constant(b)) => PathValue::Constant(f(*a, *b)),
            (PathValue::Constant(a), PathValue::Stochastic(bs)) => {
                PathValue::Stochastic(bs.iter().map(|b| f(*a, *b)).collect())
            }
            (PathValue::Stochastic(lhs), PathValue::Constant(b)) => {
                PathValue::Stochastic(lhs.iter().map(|a| f(*a, *b)).collect())
            }
            (PathValue::Stochastic(lhs), PathValue::Stochastic(rhs)) => {
                assert_eq!(
                    lhs.len(),
                    rhs.len(),
                    "path count mismatch: {} vs {}",
                    lhs.len(),
                    rhs.len()
                );
                PathValue::Stochastic(lhs.iter().zip(rhs).map(|(a, b)| f(*a, *b)).collect())
            }
        }
    }
}

impl Add for &PathValue {
    type Output = PathValue;

    fn add(self, rhs: &PathValue) -> PathValue {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl Sub for &PathValue {
    type Output = PathValue;

    fn sub(self, rhs: &PathValue) -> PathValue {
        self.zip_with(rhs, |a, b| a - b)
    }
}

impl Mul for &PathValue {
    type Output = PathValue;

    fn mul(self, rhs: &PathValue) -> PathValue {
        self.zip_with(rhs, |a, b| a * b)
    }
}

impl Div for &PathValue {
    type Output = PathValue;

    fn div(self, rhs: &PathValue) -> PathValue {
        self.zip_with(rhs, |a, b| a / b)
    }
}

impl Add<f64> for &PathValue {
    type Output = PathValue;

    fn add(self, rhs: f64) -> PathValue {
        self.map(|x| x + rhs)
    }
}

impl Sub<f64> for &PathValue {
    type Output = PathValue;

    fn sub(self, rhs: f64) -> PathValue {
        self.map(|x| x - rhs)
    }
}

impl Mul<f64> for &PathValue {
    type Output = PathValue;

    fn mul(self, rhs: f64) -> PathValue {
        self.map(|x| x * rhs)
    }
}

impl Div<f64> for &PathValue {
    type Output = PathValue;

    fn div(self, rhs: f64) -> PathValue {
        self.map(|x| x / rhs)
    }
}

impl Neg for &PathValue {
    type Output = PathValue;

    fn neg(self) -> PathValue {
        self.map(|x| -x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_broadcasts() {
        let a = PathValue::constant(2.0);
        let b = PathValue::from_values(vec![1.0, 2.0, 3.0]);
        let sum = &a + &b;
        assert_eq!(sum.num_paths(), Some(3));
        assert_relative_eq!(sum.get(2), 5.0);
    }

    #[test]
    fn test_constant_arithmetic_stays_constant() {
        let a = PathValue::constant(2.0);
        let b = PathValue::constant(3.0);
        assert!((&a * &b).is_constant());
        assert_relative_eq!((&a * &b).average(), 6.0);
    }

    #[test]
    fn test_add_product() {
        let acc = PathValue::from_values(vec![1.0, 1.0]);
        let a = PathValue::from_values(vec![2.0, 3.0]);
        let b = PathValue::constant(0.5);
        let result = acc.add_product(&a, &b);
        assert_relative_eq!(result.get(0), 2.0);
        assert_relative_eq!(result.get(1), 2.5);
    }

    #[test]
    fn test_invert_and_pow() {
        let a = PathValue::from_values(vec![2.0, 4.0]);
        assert_relative_eq!(a.invert().get(1), 0.25);
        assert_relative_eq!(a.pow(2.0).get(0), 4.0);
        assert_relative_eq!(a.pow(0.0).get(1), 1.0);
    }

    #[test]
    fn test_exp_ln_roundtrip() {
        let a = PathValue::from_values(vec![0.5, 1.5]);
        let back = a.exp().ln();
        assert_relative_eq!(back.get(0), 0.5, epsilon = 1e-12);
        assert_relative_eq!(back.get(1), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_average() {
        let a = PathValue::from_values(vec![1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(a.average(), 2.5);
        assert_relative_eq!(PathValue::constant(7.0).average(), 7.0);
    }

    #[test]
    fn test_choose_selects_per_path() {
        let trigger = PathValue::from_values(vec![1.0, -1.0, 0.0]);
        let a = PathValue::constant(10.0);
        let b = PathValue::from_values(vec![1.0, 2.0, 3.0]);
        let chosen = trigger.choose(&a, &b);
        assert_relative_eq!(chosen.get(0), 10.0);
        assert_relative_eq!(chosen.get(1), 2.0);
        // A zero trigger counts as non-negative.
        assert_relative_eq!(chosen.get(2), 10.0);
    }

    #[test]
    fn test_min() {
        let a = PathValue::from_values(vec![3.0, -1.0, 2.0]);
        assert_relative_eq!(a.min(), -1.0);
    }

    #[test]
    #[should_panic(expected = "path count mismatch")]
    fn test_mismatched_paths_panic() {
        let a = PathValue::from_values(vec![1.0, 2.0]);
        let b = PathValue::from_values(vec![1.0, 2.0, 3.0]);
        let _ = &a + &b;
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        for value in [
            PathValue::constant(0.25),
            PathValue::from_values(vec![1.0, -2.0, 3.5]),
        ] {
            let json = serde_json::to_string(&value).unwrap();
            let back: PathValue = serde_json::from_str(&json).unwrap();
            assert_eq!(back, value);
        }
    }
}
