//! Interest-rate products and the lifecycle-boundary capability.
//!
//! Products are closed behind [`RatesProduct`] (enum dispatch, as for the
//! model enum) and expose their margin-relevant behaviour through
//! [`MarginProduct`]: the risk-factor gradient, a path-wise value, and the
//! lifecycle boundary the melting engine queries polymorphically instead of
//! branching on concrete types.

mod bermudan;
mod swap;
mod swaption;

pub use bermudan::BermudanSwaption;
pub use swap::VanillaSwap;
pub use swaption::EuropeanSwaption;

use thiserror::Error;

use simm_core::{CurveKey, PathValue, RiskClass};

use crate::engine::RatesEngine;
use crate::error::ModelError;
use crate::gradient::RiskFactorGradient;

/// Sentinel exercise time for paths on which an option is never exercised.
pub const NEVER_EXERCISED: f64 = f64::INFINITY;

/// Settlement convention of an exercised swaption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryType {
    /// Exercise delivers the underlying swap; sensitivities re-anchor at
    /// the exercise date.
    Physical,
    /// Exercise settles in cash; sensitivities vanish past exercise.
    Cash,
}

/// A lifecycle boundary of a product: the first time at which its
/// sensitivity profile changes kind (option exercise, forward start).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProductBoundary {
    /// The boundary time (year fraction).
    pub time: f64,
    /// Whether the initial melting time is pinned to the boundary once
    /// crossed (physical swaption, forward-starting swap).
    pub pins_melting_time: bool,
}

/// Errors from product construction.
#[derive(Debug, Error)]
pub enum ProductError {
    /// A product schedule has no periods.
    #[error("product schedule is empty")]
    EmptySchedule,

    /// Schedule vectors differ in length.
    #[error("schedule mismatch: {fixings} fixings vs {payments} payments")]
    ScheduleMismatch {
        /// Number of fixing times.
        fixings: usize,
        /// Number of payment times.
        payments: usize,
    },

    /// Schedule times are not ordered as required.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
}

/// Margin-relevant behaviour of a portfolio product.
///
/// The melting engine and the sensitivity transformation consume products
/// exclusively through this trait.
pub trait MarginProduct {
    /// Curves the product has delta sensitivity against.
    fn curves(&self) -> Vec<CurveKey>;

    /// SIMM risk classes the product contributes to.
    fn risk_classes(&self) -> Vec<RiskClass> {
        vec![RiskClass::InterestRate]
    }

    /// Gradient of the product value with respect to native risk factors.
    ///
    /// `post_boundary` selects the gradient of the post-lifecycle
    /// instrument (e.g. the delivered swap of a physical swaption).
    fn gradient(
        &self,
        engine: &dyn RatesEngine,
        post_boundary: bool,
    ) -> Result<RiskFactorGradient, ModelError>;

    /// Path-wise product value at `time`, in numeraire units.
    fn value(&self, time: f64, engine: &dyn RatesEngine) -> Result<PathValue, ModelError>;

    /// The product's lifecycle boundary, if any.
    fn boundary(&self) -> Option<ProductBoundary>;

    /// Last time up to which interpolation between exact snapshots is
    /// meaningful; afterwards the engine falls back to melting.
    fn terminal_interpolation_time(
        &self,
        engine: &dyn RatesEngine,
    ) -> Result<Option<f64>, ModelError> {
        let _ = engine;
        Ok(None)
    }

    /// Scheduled exercise dates (Bermudan only).
    fn exercise_times(&self) -> Option<&[f64]> {
        None
    }

    /// Path-wise first exercise time ([`NEVER_EXERCISED`] where the option
    /// is never exercised), if the product is exercisable path-by-path.
    fn path_exercise_time(
        &self,
        engine: &dyn RatesEngine,
    ) -> Result<Option<PathValue>, ModelError> {
        let _ = engine;
        Ok(None)
    }

    /// Whether the product can terminate early (drives survival damping).
    fn is_cancelable(&self) -> bool {
        false
    }

    /// The underlying swap whose schedule seeds Bermudan re-accumulation
    /// and physical delivery.
    fn underlying_swap(&self) -> Option<&VanillaSwap> {
        None
    }
}

/// Closed set of supported products.
#[derive(Clone, Debug)]
pub enum RatesProduct {
    /// A (possibly forward-starting) fixed-for-floating swap.
    Swap(VanillaSwap),
    /// A European swaption.
    Swaption(EuropeanSwaption),
    /// A Bermudan swaption.
    Bermudan(BermudanSwaption),
}

impl MarginProduct for RatesProduct {
    fn curves(&self) -> Vec<CurveKey> {
        match self {
            RatesProduct::Swap(p) => p.curves(),
            RatesProduct::Swaption(p) => p.curves(),
            RatesProduct::Bermudan(p) => p.curves(),
        }
    }

    fn gradient(
        &self,
        engine: &dyn RatesEngine,
        post_boundary: bool,
    ) -> Result<RiskFactorGradient, ModelError> {
        match self {
            RatesProduct::Swap(p) => p.gradient(engine, post_boundary),
            RatesProduct::Swaption(p) => p.gradient(engine, post_boundary),
            RatesProduct::Bermudan(p) => p.gradient(engine, post_boundary),
        }
    }

    fn value(&self, time: f64, engine: &dyn RatesEngine) -> Result<PathValue, ModelError> {
        match self {
            RatesProduct::Swap(p) => p.value(time, engine),
            RatesProduct::Swaption(p) => p.value(time, engine),
            RatesProduct::Bermudan(p) => p.value(time, engine),
        }
    }

    fn boundary(&self) -> Option<ProductBoundary> {
        match self {
            RatesProduct::Swap(p) => p.boundary(),
            RatesProduct::Swaption(p) => p.boundary(),
            RatesProduct::Bermudan(p) => p.boundary(),
        }
    }

    fn terminal_interpolation_time(
        &self,
        engine: &dyn RatesEngine,
    ) -> Result<Option<f64>, ModelError> {
        match self {
            RatesProduct::Swap(p) => p.terminal_interpolation_time(engine),
            RatesProduct::Swaption(p) => p.terminal_interpolation_time(engine),
            RatesProduct::Bermudan(p) => p.terminal_interpolation_time(engine),
        }
    }

    fn exercise_times(&self) -> Option<&[f64]> {
        match self {
            RatesProduct::Swap(p) => p.exercise_times(),
            RatesProduct::Swaption(p) => p.exercise_times(),
            RatesProduct::Bermudan(p) => p.exercise_times(),
        }
    }

    fn path_exercise_time(
        &self,
        engine: &dyn RatesEngine,
    ) -> Result<Option<PathValue>, ModelError> {
        match self {
            RatesProduct::Swap(p) => p.path_exercise_time(engine),
            RatesProduct::Swaption(p) => p.path_exercise_time(engine),
            RatesProduct::Bermudan(p) => p.path_exercise_time(engine),
        }
    }

    fn is_cancelable(&self) -> bool {
        match self {
            RatesProduct::Swap(p) => p.is_cancelable(),
            RatesProduct::Swaption(p) => p.is_cancelable(),
            RatesProduct::Bermudan(p) => p.is_cancelable(),
        }
    }

    fn underlying_swap(&self) -> Option<&VanillaSwap> {
        match self {
            RatesProduct::Swap(p) => p.underlying_swap(),
            RatesProduct::Swaption(p) => p.underlying_swap(),
            RatesProduct::Bermudan(p) => p.underlying_swap(),
        }
    }
}
