//! Model error types.

use simm_core::CurveError;
use thiserror::Error;

/// Errors raised by a [`crate::RatesEngine`] implementation.
///
/// These are fatal for the current request: a time or risk factor the model
/// cannot represent will not become representable on retry.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Requested time is outside the simulated horizon.
    #[error("time {time} is not representable by the model state")]
    TimeOutOfRange {
        /// The requested time (year fraction).
        time: f64,
    },

    /// Requested forward-rate index does not exist on the tenor grid.
    #[error("forward rate index {index} out of range (model has {count})")]
    FactorOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of forward rates in the model.
        count: usize,
    },

    /// The discount curve rejected a query or construction.
    #[error(transparent)]
    Curve(#[from] CurveError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ModelError::TimeOutOfRange { time: 31.0 };
        assert!(err.to_string().contains("31"));

        let err = ModelError::FactorOutOfRange {
            index: 12,
            count: 10,
        };
        assert!(err.to_string().contains("12"));
    }
}
