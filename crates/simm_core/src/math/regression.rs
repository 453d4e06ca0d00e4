//! Regression-based conditional expectation.
//!
//! Projects a path-wise value onto the linear span of a set of basis
//! processes known at the evaluation time. This is the estimator used
//! wherever a future quantity must be expressed in terms of time-t
//! information (swap-rate Jacobians, off-grid sensitivities, survival
//! indicators).

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::types::PathValue;

/// Singular-value cutoff for the basis pseudo-inverse.
const SVD_EPSILON: f64 = 1e-12;

/// Errors from building a regression operator.
#[derive(Debug, Error)]
pub enum RegressionError {
    /// No basis functions supplied.
    #[error("regression basis is empty")]
    EmptyBasis,

    /// A basis function has a path count different from the operator's.
    #[error("basis path count mismatch: expected {expected}, got {actual}")]
    PathCountMismatch {
        /// Path count of the operator.
        expected: usize,
        /// Path count of the offending basis function.
        actual: usize,
    },

    /// The SVD of the design matrix failed to converge.
    #[error("regression basis decomposition failed: {0}")]
    SingularBasis(String),
}

/// A least-squares projection operator built from path-wise basis functions.
///
/// Once built the operator is a pure function from path-wise values to their
/// best linear-regression estimate given the basis; it is reused for every
/// projection at a given evaluation time.
///
/// # Examples
///
/// ```
/// use simm_core::{ConditionalExpectation, PathValue};
///
/// let regressor = PathValue::from_values(vec![1.0, 2.0, 3.0, 4.0]);
/// let op = ConditionalExpectation::with_monomials(&[regressor], 2, 4).unwrap();
///
/// // A value already in the span projects onto itself.
/// let value = PathValue::from_values(vec![1.0, 4.0, 9.0, 16.0]);
/// let projected = op.project(&value);
/// assert!((projected.get(2) - 9.0).abs() < 1e-8);
/// ```
#[derive(Clone, Debug)]
pub struct ConditionalExpectation {
    /// Design matrix, `num_paths x num_basis`.
    design: DMatrix<f64>,
    /// Pseudo-inverse of the design matrix, `num_basis x num_paths`.
    solver: DMatrix<f64>,
    num_paths: usize,
}

impl ConditionalExpectation {
    /// Builds the operator from explicit basis functions.
    pub fn new(basis: &[PathValue], num_paths: usize) -> Result<Self, RegressionError> {
        if basis.is_empty() {
            return Err(RegressionError::EmptyBasis);
        }
        for function in basis {
            if let Some(paths) = function.num_paths() {
                if paths != num_paths {
                    return Err(RegressionError::PathCountMismatch {
                        expected: num_paths,
                        actual: paths,
                    });
                }
            }
        }

        let design = DMatrix::from_fn(num_paths, basis.len(), |path, j| basis[j].get(path));
        let solver = design
            .clone()
            .pseudo_inverse(SVD_EPSILON)
            .map_err(|message| RegressionError::SingularBasis(message.to_string()))?;

        Ok(Self {
            design,
            solver,
            num_paths,
        })
    }

    /// Builds the operator from regressors expanded into monomials of
    /// powers `0..=order` (polynomial regression).
    pub fn with_monomials(
        regressors: &[PathValue],
        order: u32,
        num_paths: usize,
    ) -> Result<Self, RegressionError> {
        let mut basis = Vec::with_capacity(regressors.len() * (order as usize + 1));
        for regressor in regressors {
            for power in 0..=order {
                basis.push(regressor.pow(power as f64));
            }
        }
        Self::new(&basis, num_paths)
    }

    /// Number of paths the operator was built for.
    pub fn num_paths(&self) -> usize {
        self.num_paths
    }

    /// Projects a path-wise value onto the basis span.
    ///
    /// Constants are invariant under conditioning and pass through
    /// unchanged.
    pub fn project(&self, value: &PathValue) -> PathValue {
        match value {
            PathValue::Constant(_) => value.clone(),
            PathValue::Stochastic(values) => {
                let y = DVector::from_column_slice(values);
                let coefficients = &self.solver * y;
                let fitted = &self.design * coefficients;
                PathValue::Stochastic(fitted.iter().copied().collect())
            }
        }
    }
}
