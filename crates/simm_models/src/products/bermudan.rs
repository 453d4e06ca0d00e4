//! Bermudan swaption with path-wise exercise times.

use simm_core::{CurveKey, PathValue};

use crate::engine::RatesEngine;
use crate::error::ModelError;
use crate::gradient::RiskFactorGradient;

use super::{MarginProduct, ProductBoundary, ProductError, VanillaSwap, NEVER_EXERCISED};

/// Option to enter `underlying` (from the exercise date onwards) at any of
/// several scheduled dates. Delivery is physical.
///
/// The exercise rule is a simple in-the-money trigger on the co-terminal
/// swap rate, evaluated path by path; paths that never trigger carry the
/// [`NEVER_EXERCISED`] sentinel so that exercise arithmetic stays ordinary
/// float comparison.
#[derive(Clone, Debug)]
pub struct BermudanSwaption {
    underlying: VanillaSwap,
    exercise_times: Vec<f64>,
}

impl BermudanSwaption {
    /// Builds a Bermudan over strictly increasing exercise dates.
    pub fn new(underlying: VanillaSwap, exercise_times: Vec<f64>) -> Result<Self, ProductError> {
        if exercise_times.is_empty() {
            return Err(ProductError::EmptySchedule);
        }
        for window in exercise_times.windows(2) {
            if window[1] <= window[0] {
                return Err(ProductError::InvalidSchedule(
                    "exercise times not increasing".to_string(),
                ));
            }
        }
        if *exercise_times.last().unwrap() >= underlying.last_payment_time() {
            return Err(ProductError::InvalidSchedule(
                "exercise after last underlying payment".to_string(),
            ));
        }
        Ok(Self {
            underlying,
            exercise_times,
        })
    }

    /// Last scheduled exercise date.
    pub fn last_exercise_time(&self) -> f64 {
        *self.exercise_times.last().unwrap()
    }
}

impl MarginProduct for BermudanSwaption {
    fn curves(&self) -> Vec<CurveKey> {
        self.underlying.curves()
    }

    fn gradient(
        &self,
        engine: &dyn RatesEngine,
        post_boundary: bool,
    ) -> Result<RiskFactorGradient, ModelError> {
        // Exercise masking happens downstream in the projection; here the
        // gradient is that of the co-terminal swap.
        self.underlying.gradient(engine, post_boundary)
    }

    fn value(&self, time: f64, engine: &dyn RatesEngine) -> Result<PathValue, ModelError> {
        let swap_value = self.underlying.value(time, engine)?;
        let exercise = self
            .path_exercise_time(engine)?
            .unwrap_or_else(|| PathValue::constant(NEVER_EXERCISED));
        // Exercised paths hold the swap; the rest hold intrinsic value.
        let intrinsic = swap_value.choose(&swap_value, &PathValue::zero());
        let elapsed = &(-&exercise) + time;
        Ok(elapsed.choose(&swap_value, &intrinsic))
    }

    fn boundary(&self) -> Option<ProductBoundary> {
        Some(ProductBoundary {
            time: self.exercise_times[0],
            pins_melting_time: false,
        })
    }

    fn terminal_interpolation_time(
        &self,
        engine: &dyn RatesEngine,
    ) -> Result<Option<f64>, ModelError> {
        // Interpolation is meaningful up to the first exercise observed on
        // any path; capped so the result stays finite.
        let exercise = self
            .path_exercise_time(engine)?
            .unwrap_or_else(|| PathValue::constant(NEVER_EXERCISED));
        Ok(Some(exercise.min().min(self.last_exercise_time())))
    }

    fn exercise_times(&self) -> Option<&[f64]> {
        Some(&self.exercise_times)
    }

    fn path_exercise_time(
        &self,
        engine: &dyn RatesEngine,
    ) -> Result<Option<PathValue>, ModelError> {
        let strike = self.underlying.swap_rate();
        let maturity = self.underlying.last_payment_time();
        let mut exercise = vec![NEVER_EXERCISED; engine.num_paths()];
        for &time in &self.exercise_times {
            let swap_rate = engine.spanning_rate(time, time, maturity)?;
            for (path, slot) in exercise.iter_mut().enumerate() {
                if slot.is_infinite() && swap_rate.get(path) > strike {
                    *slot = time;
                }
            }
        }
        Ok(Some(PathValue::from_values(exercise)))
    }

    fn is_cancelable(&self) -> bool {
        true
    }

    fn underlying_swap(&self) -> Option<&VanillaSwap> {
        Some(&self.underlying)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use simm_core::LogLinearCurve;

    use crate::engine::{LognormalForwardModel, LognormalModelParams, RatesEngine};

    use super::*;

    fn engine(forward: f64) -> LognormalForwardModel {
        let params = LognormalModelParams::new(0.5, vec![forward; 8], 0.0, 3, 11);
        let curve = LogLinearCurve::new(
            vec![1.0, 4.0],
            vec![PathValue::constant(0.98), PathValue::constant(0.90)],
        )
        .unwrap();
        LognormalForwardModel::new(params, curve).unwrap()
    }

    fn bermudan(strike: f64) -> BermudanSwaption {
        let underlying = VanillaSwap::new(
            vec![1.0, 1.5, 2.0, 2.5],
            vec![1.5, 2.0, 2.5, 3.0],
            strike,
            1.0,
            true,
        )
        .unwrap();
        BermudanSwaption::new(underlying, vec![1.0, 1.5, 2.0]).unwrap()
    }

    #[test]
    fn test_exercise_schedule_validation() {
        let underlying =
            VanillaSwap::new(vec![1.0, 1.5], vec![1.5, 2.0], 0.02, 1.0, true).unwrap();
        assert!(matches!(
            BermudanSwaption::new(underlying.clone(), vec![]),
            Err(ProductError::EmptySchedule)
        ));
        assert!(matches!(
            BermudanSwaption::new(underlying.clone(), vec![1.0, 1.0]),
            Err(ProductError::InvalidSchedule(_))
        ));
        assert!(matches!(
            BermudanSwaption::new(underlying, vec![2.5]),
            Err(ProductError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn test_in_the_money_exercises_at_first_date() {
        // Flat forwards at 3% against a 2% strike trigger immediately.
        let engine = engine(0.03);
        let exercise = bermudan(0.02).path_exercise_time(&engine).unwrap().unwrap();
        for path in 0..engine.num_paths() {
            assert_relative_eq!(exercise.get(path), 1.0);
        }
    }

    #[test]
    fn test_out_of_the_money_never_exercises() {
        let engine = engine(0.01);
        let exercise = bermudan(0.02).path_exercise_time(&engine).unwrap().unwrap();
        for path in 0..engine.num_paths() {
            assert!(exercise.get(path).is_infinite());
        }
    }

    #[test]
    fn test_terminal_interpolation_capped_at_last_exercise() {
        let engine = engine(0.01);
        let terminal = bermudan(0.02)
            .terminal_interpolation_time(&engine)
            .unwrap()
            .unwrap();
        assert_relative_eq!(terminal, 2.0);
    }
}
