//! Core type definitions.
//!
//! - [`PathValue`]: path-wise Monte Carlo values
//! - [`RiskClass`], [`CurveKey`]: closed regulatory vocabulary

mod keys;
mod paths;

pub use keys::{CurveKey, RiskClass};
pub use paths::PathValue;
