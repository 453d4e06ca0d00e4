//! Numerical building blocks.
//!
//! - [`ConditionalExpectation`]: least-squares projection of path-wise
//!   values onto a regression basis
//! - [`LogLinearCurve`]: pillar-based discount curve with analytic
//!   interpolation derivatives

mod loglinear;
mod regression;

pub use loglinear::{CurveError, LogLinearCurve};
pub use regression::{ConditionalExpectation, RegressionError};
