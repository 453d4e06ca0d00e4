//! European swaption with exercise-boundary lifecycle.

use simm_core::{CurveKey, PathValue};

use crate::engine::RatesEngine;
use crate::error::ModelError;
use crate::gradient::RiskFactorGradient;

use super::{DeliveryType, MarginProduct, ProductBoundary, VanillaSwap};

/// European option to enter `underlying` at `exercise_time`.
///
/// Physical delivery re-anchors the sensitivity profile to the delivered
/// swap once exercised; cash settlement extinguishes it.
#[derive(Clone, Debug)]
pub struct EuropeanSwaption {
    underlying: VanillaSwap,
    exercise_time: f64,
    delivery: DeliveryType,
}

impl EuropeanSwaption {
    /// Builds a swaption. The exercise time is conventionally the
    /// underlying's first fixing.
    pub fn new(underlying: VanillaSwap, exercise_time: f64, delivery: DeliveryType) -> Self {
        Self {
            underlying,
            exercise_time,
            delivery,
        }
    }

    /// Exercise date (year fraction).
    pub fn exercise_time(&self) -> f64 {
        self.exercise_time
    }

    /// Settlement convention.
    pub fn delivery(&self) -> DeliveryType {
        self.delivery
    }
}

impl MarginProduct for EuropeanSwaption {
    fn curves(&self) -> Vec<CurveKey> {
        self.underlying.curves()
    }

    fn gradient(
        &self,
        engine: &dyn RatesEngine,
        post_boundary: bool,
    ) -> Result<RiskFactorGradient, ModelError> {
        if post_boundary && self.delivery == DeliveryType::Cash {
            // Cash settlement leaves no position behind.
            return Ok(RiskFactorGradient::new());
        }
        // Pre-exercise sensitivities are those of the forward swap; the
        // conditional-expectation projection onto the exercise indicator
        // downstream restricts them to in-the-money paths.
        self.underlying.gradient(engine, post_boundary)
    }

    fn value(&self, time: f64, engine: &dyn RatesEngine) -> Result<PathValue, ModelError> {
        let swap_value = self.underlying.value(time, engine)?;
        if time >= self.exercise_time && self.delivery == DeliveryType::Physical {
            return Ok(swap_value);
        }
        // Intrinsic floor before exercise (and for cash settlement).
        Ok(swap_value.choose(&swap_value, &PathValue::zero()))
    }

    fn boundary(&self) -> Option<ProductBoundary> {
        Some(ProductBoundary {
            time: self.exercise_time,
            pins_melting_time: self.delivery == DeliveryType::Physical,
        })
    }

    fn terminal_interpolation_time(
        &self,
        _engine: &dyn RatesEngine,
    ) -> Result<Option<f64>, ModelError> {
        Ok(Some(self.exercise_time))
    }

    fn is_cancelable(&self) -> bool {
        true
    }

    fn underlying_swap(&self) -> Option<&VanillaSwap> {
        Some(&self.underlying)
    }
}
