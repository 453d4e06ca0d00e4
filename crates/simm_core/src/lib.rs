//! # Simm Core (L1: Foundation)
//!
//! Path-wise value types and numerical building blocks shared by the
//! simm-dynamics workspace.
//!
//! This crate provides:
//! - [`PathValue`]: a value carried per Monte Carlo path, with broadcastable
//!   constants and the arithmetic used by the sensitivity pipeline
//! - [`TimeGrid`]: tenor/time discretisations with nearest-index lookups
//! - [`math::ConditionalExpectation`]: regression-based projection of
//!   path-wise values onto time-t information
//! - [`math::LogLinearCurve`]: a discount curve with analytic
//!   interpolation derivatives
//! - Shared regulatory vocabulary ([`RiskClass`], [`CurveKey`])
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               simm_core (L1)                  │
//! ├──────────────────────────────────────────────┤
//! │  types/   - PathValue, RiskClass, CurveKey   │
//! │  time     - TimeGrid, act/365 day offsets    │
//! │  math/    - regression, log-linear curves    │
//! └──────────────────────────────────────────────┘
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

pub mod math;
pub mod time;
pub mod types;

pub use math::{ConditionalExpectation, CurveError, LogLinearCurve, RegressionError};
pub use time::{day_offset, TimeGrid, DAYS_PER_YEAR};
pub use types::{CurveKey, PathValue, RiskClass};
