//! # Simm Models (L2: Market Models & Products)
//!
//! The Monte Carlo forward-rate engine interface, risk-factor gradients and
//! the interest-rate products whose margin sensitivities the workspace
//! computes.
//!
//! This crate provides:
//! - [`RatesEngine`]: the trait through which the sensitivity pipeline
//!   consumes the path simulation (forward rates, numeraire, time-zero
//!   discount curve)
//! - [`LognormalForwardModel`]: a seeded reference implementation used by
//!   tests and demos
//! - [`RiskFactorGradient`]: the one-time gradient of a product value with
//!   respect to the model's native risk factors
//! - Products: [`VanillaSwap`], [`EuropeanSwaption`], [`BermudanSwaption`],
//!   unified behind [`MarginProduct`] with the lifecycle-boundary capability
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              simm_models (L2)                 │
//! ├──────────────────────────────────────────────┤
//! │  engine/    - RatesEngine, lognormal model   │
//! │  gradient   - RiskFactorKey, gradients       │
//! │  products/  - swap, swaption, Bermudan       │
//! └──────────────────────────────────────────────┘
//! ```

pub mod engine;
pub mod gradient;
pub mod products;

mod error;

pub use engine::{LognormalForwardModel, LognormalModelParams, RatesEngine};
pub use error::ModelError;
pub use gradient::{RiskFactorGradient, RiskFactorKey};
pub use products::{
    BermudanSwaption, DeliveryType, EuropeanSwaption, MarginProduct, ProductBoundary,
    ProductError, RatesProduct, VanillaSwap, NEVER_EXERCISED,
};
