use thiserror::Error;

use simm_core::RegressionError;
use simm_models::ModelError;

/// Errors surfaced by the sensitivity pipeline.
///
/// Missing sensitivities are never an error (they read as zero);
/// [`SensitivityError::StaleCacheAccess`] marks a caller logic defect and
/// is terminal for the instrument.
#[derive(Debug, Error)]
pub enum SensitivityError {
    /// No model has been attached to the portfolio.
    #[error("no model attached to the portfolio")]
    ModelUnavailable,

    /// An SVD produced non-finite output.
    #[error("singular matrix in {context}")]
    SingularMatrix {
        /// Which decomposition failed.
        context: &'static str,
    },

    /// Evaluation time regressed behind a crossed lifecycle boundary.
    #[error("stale cache access: day {requested_day} is behind the crossed boundary at day {boundary_day}")]
    StaleCacheAccess {
        /// Canonical day offset of the requested evaluation time.
        requested_day: i64,
        /// Canonical day offset of the boundary that was crossed.
        boundary_day: i64,
    },

    /// Product index outside the portfolio.
    #[error("product index {index} out of range ({count} products)")]
    ProductOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of products in the portfolio.
        count: usize,
    },

    /// Maturity bucket index outside the risk class's bucket table.
    #[error("bucket index {index} out of range ({count} buckets)")]
    BucketOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of buckets for the risk class.
        count: usize,
    },

    /// Error from the model layer.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Error from the regression operator.
    #[error(transparent)]
    Regression(#[from] RegressionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SensitivityError::StaleCacheAccess {
            requested_day: 183,
            boundary_day: 365,
        };
        assert!(err.to_string().contains("day 183"));
        assert!(err.to_string().contains("day 365"));
    }
}
