//! Seeded lognormal forward-rate reference model.
//!
//! A deliberately small single-factor model: every forward rate follows a
//! driftless lognormal process under the spot measure, all rates share one
//! Brownian driver, and the numeraire is the discretely rolled money-market
//! account on the tenor grid. It exists to exercise the sensitivity
//! pipeline, not to be a production model; the pipeline itself only sees
//! [`RatesEngine`].

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use simm_core::{LogLinearCurve, PathValue, TimeGrid};

use super::RatesEngine;
use crate::error::ModelError;

/// Parameters of the [`LognormalForwardModel`].
#[derive(Clone, Debug)]
pub struct LognormalModelParams {
    /// Native tenor period length (year fraction), e.g. `0.5`.
    pub tenor_step: f64,
    /// Initial forward rates, one per tenor period.
    pub initial_forwards: Vec<f64>,
    /// Lognormal volatility of every forward rate. Zero gives the
    /// deterministic limit used by the weight-mode comparison tests.
    pub volatility: f64,
    /// Number of simulated paths.
    pub num_paths: usize,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

impl LognormalModelParams {
    /// Creates parameters with validation deferred to model construction.
    pub fn new(
        tenor_step: f64,
        initial_forwards: Vec<f64>,
        volatility: f64,
        num_paths: usize,
        seed: u64,
    ) -> Self {
        Self {
            tenor_step,
            initial_forwards,
            volatility,
            num_paths,
            seed,
        }
    }
}

/// Reference implementation of [`RatesEngine`].
pub struct LognormalForwardModel {
    grid: TimeGrid,
    initial_forwards: Vec<f64>,
    volatility: f64,
    num_paths: usize,
    /// Brownian driver at each grid time, `brownian[grid_index][path]`.
    brownian: Vec<Vec<f64>>,
    /// Money-market numeraire at each grid time, `numeraire[grid_index][path]`.
    numeraire: Vec<Vec<f64>>,
    discount_curve: LogLinearCurve,
}

impl LognormalForwardModel {
    /// Builds the model and simulates its driver and numeraire paths.
    pub fn new(
        params: LognormalModelParams,
        discount_curve: LogLinearCurve,
    ) -> Result<Self, ModelError> {
        if params.tenor_step <= 0.0 {
            return Err(ModelError::TimeOutOfRange {
                time: params.tenor_step,
            });
        }
        let num_periods = params.initial_forwards.len();
        if num_periods == 0 || params.num_paths == 0 {
            return Err(ModelError::FactorOutOfRange {
                index: 0,
                count: num_periods,
            });
        }

        let grid = TimeGrid::regular(0.0, num_periods, params.tenor_step);
        let mut rng = StdRng::seed_from_u64(params.seed);
        let sqrt_dt = params.tenor_step.sqrt();

        // Shared Brownian driver, one increment per tenor period.
        let mut brownian = vec![vec![0.0; params.num_paths]; num_periods + 1];
        for j in 0..num_periods {
            for path in 0..params.num_paths {
                let z: f64 = StandardNormal.sample(&mut rng);
                brownian[j + 1][path] = brownian[j][path] + sqrt_dt * z;
            }
        }

        let model = Self {
            grid,
            initial_forwards: params.initial_forwards,
            volatility: params.volatility,
            num_paths: params.num_paths,
            brownian,
            numeraire: Vec::new(),
            discount_curve,
        };

        // Roll the money-market account along the grid.
        let mut numeraire = vec![vec![1.0; model.num_paths]; num_periods + 1];
        for j in 0..num_periods {
            let rate = model.forward_at_grid(j, j);
            for path in 0..model.num_paths {
                numeraire[j + 1][path] =
                    numeraire[j][path] * (1.0 + rate.get(path) * model.grid.first_step());
            }
        }

        Ok(Self { numeraire, ..model })
    }

    /// Forward rate `index` observed at grid time `obs`, with `obs` clamped
    /// to the rate's fixing index.
    fn forward_at_grid(&self, obs: usize, index: usize) -> PathValue {
        let obs = obs.min(index);
        let t = self.grid.time(obs);
        let drift = -0.5 * self.volatility * self.volatility * t;
        let values = (0..self.num_paths)
            .map(|path| {
                self.initial_forwards[index]
                    * (drift + self.volatility * self.brownian[obs][path]).exp()
            })
            .collect();
        PathValue::Stochastic(values)
    }

    fn check_time(&self, time: f64) -> Result<(), ModelError> {
        if time < 0.0 || time > self.grid.last_time() + 1e-10 {
            return Err(ModelError::TimeOutOfRange { time });
        }
        Ok(())
    }
}

impl RatesEngine for LognormalForwardModel {
    fn tenor_grid(&self) -> &TimeGrid {
        &self.grid
    }

    fn num_paths(&self) -> usize {
        self.num_paths
    }

    fn forward_rate(&self, time: f64, index: usize) -> Result<PathValue, ModelError> {
        if index >= self.num_forward_rates() {
            return Err(ModelError::FactorOutOfRange {
                index,
                count: self.num_forward_rates(),
            });
        }
        if time < 0.0 {
            return Err(ModelError::TimeOutOfRange { time });
        }
        // Left-continuous observation on the grid.
        let obs = self.grid.index_le(time).unwrap_or(0);
        Ok(self.forward_at_grid(obs, index))
    }

    fn spanning_rate(&self, time: f64, start: f64, end: f64) -> Result<PathValue, ModelError> {
        self.check_time(start.min(time))?;
        if end <= start {
            return Err(ModelError::TimeOutOfRange { time: end });
        }
        let dt = self.grid.first_step();
        let first = self.grid.index_le(start).unwrap_or(0);
        let last = self
            .grid
            .index_le(end - 1e-10)
            .unwrap_or(first)
            .min(self.num_forward_rates() - 1)
            .max(first);

        // Accrue over the covered native periods, then annualise.
        let mut accrual = PathValue::constant(1.0);
        for k in first..=last {
            let rate = self.forward_rate(time, k)?;
            accrual = &accrual * &(&(&rate * dt) + 1.0);
        }
        Ok(&(&accrual - 1.0) / (end - start))
    }

    fn numeraire(&self, time: f64) -> Result<PathValue, ModelError> {
        self.check_time(time)?;
        let j = self.grid.index_le(time).unwrap_or(0);
        let base = PathValue::Stochastic(self.numeraire[j].clone());
        if self.grid.contains_time(time) {
            return Ok(base);
        }
        // Off-grid: accrue the current period pro rata in log space.
        let fraction = (time - self.grid.time(j)) / self.grid.first_step();
        let rate = self.forward_at_grid(j, j.min(self.num_forward_rates() - 1));
        let growth = (&(&rate * self.grid.first_step()) + 1.0).pow(fraction);
        Ok(&base * &growth)
    }

    fn discount_curve(&self) -> &LogLinearCurve {
        &self.discount_curve
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat_discount_curve() -> LogLinearCurve {
        let times: Vec<f64> = vec![0.5, 1.0, 2.0, 5.0, 30.0];
        let factors = times
            .iter()
            .map(|t| PathValue::constant((-0.02 * t).exp()))
            .collect();
        LogLinearCurve::new(times, factors).unwrap()
    }

    fn deterministic_model() -> LognormalForwardModel {
        let params = LognormalModelParams::new(0.5, vec![0.02; 10], 0.0, 4, 42);
        LognormalForwardModel::new(params, flat_discount_curve()).unwrap()
    }

    #[test]
    fn test_deterministic_forwards_stay_initial() {
        let model = deterministic_model();
        for index in 0..model.num_forward_rates() {
            let rate = model.forward_rate(1.0, index).unwrap();
            assert_relative_eq!(rate.average(), 0.02, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_numeraire_rolls_up() {
        let model = deterministic_model();
        let n_half = model.numeraire(0.5).unwrap().average();
        assert_relative_eq!(n_half, 1.01, epsilon = 1e-12);
        let n_one = model.numeraire(1.0).unwrap().average();
        assert_relative_eq!(n_one, 1.01 * 1.01, epsilon = 1e-12);
    }

    #[test]
    fn test_numeraire_off_grid_between_grid_values() {
        let model = deterministic_model();
        let n_mid = model.numeraire(0.75).unwrap().average();
        assert!(n_mid > model.numeraire(0.5).unwrap().average());
        assert!(n_mid < model.numeraire(1.0).unwrap().average());
    }

    #[test]
    fn test_spanning_rate_flat_curve() {
        let model = deterministic_model();
        let rate = model.spanning_rate(0.0, 0.0, 5.0).unwrap().average();
        // Annualised simple rate over 5y of semi-annual 2% compounding.
        let accrual = 1.01f64.powi(10);
        assert_relative_eq!(rate, (accrual - 1.0) / 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_out_of_range_requests_fail() {
        let model = deterministic_model();
        assert!(model.forward_rate(0.0, 10).is_err());
        assert!(model.numeraire(6.0).is_err());
        assert!(model.numeraire(-0.5).is_err());
    }

    #[test]
    fn test_seed_reproducibility() {
        let params = LognormalModelParams::new(0.5, vec![0.02; 6], 0.3, 8, 7);
        let a = LognormalForwardModel::new(params.clone(), flat_discount_curve()).unwrap();
        let b = LognormalForwardModel::new(params, flat_discount_curve()).unwrap();
        let ra = a.forward_rate(1.5, 4).unwrap();
        let rb = b.forward_rate(1.5, 4).unwrap();
        for path in 0..8 {
            assert_relative_eq!(ra.get(path), rb.get(path));
        }
    }

    #[test]
    fn test_martingale_like_average_under_low_vol() {
        let params = LognormalModelParams::new(0.5, vec![0.03; 8], 0.1, 4000, 11);
        let model = LognormalForwardModel::new(params, flat_discount_curve()).unwrap();
        let rate = model.forward_rate(2.0, 7).unwrap();
        // Driftless lognormal: cross-path mean stays near the initial level.
        assert_relative_eq!(rate.average(), 0.03, epsilon = 2e-3);
    }
}
