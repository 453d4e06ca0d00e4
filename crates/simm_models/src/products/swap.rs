//! Fixed-for-floating interest-rate swap with analytic risk-factor gradient.

use simm_core::{CurveKey, PathValue};

use crate::engine::RatesEngine;
use crate::error::ModelError;
use crate::gradient::{RiskFactorGradient, RiskFactorKey};

use super::{MarginProduct, ProductBoundary, ProductError};

/// A (possibly forward-starting, amortising) fixed-for-floating swap.
///
/// Period `i` fixes the forward at `fixing_times[i]`, pays
/// `(L_i - K_i) * dt_i * notional_i` at `payment_times[i]` when receiving
/// float, with the sign flipped when receiving fixed.
#[derive(Clone, Debug)]
pub struct VanillaSwap {
    fixing_times: Vec<f64>,
    payment_times: Vec<f64>,
    swap_rates: Vec<f64>,
    period_notionals: Vec<f64>,
    pay_fixed: bool,
}

impl VanillaSwap {
    /// Builds a swap with a flat fixed rate and constant notional.
    pub fn new(
        fixing_times: Vec<f64>,
        payment_times: Vec<f64>,
        swap_rate: f64,
        notional: f64,
        pay_fixed: bool,
    ) -> Result<Self, ProductError> {
        if fixing_times.is_empty() {
            return Err(ProductError::EmptySchedule);
        }
        if fixing_times.len() != payment_times.len() {
            return Err(ProductError::ScheduleMismatch {
                fixings: fixing_times.len(),
                payments: payment_times.len(),
            });
        }
        for (i, (&fix, &pay)) in fixing_times.iter().zip(&payment_times).enumerate() {
            if pay <= fix {
                return Err(ProductError::InvalidSchedule(format!(
                    "payment {pay} not after fixing {fix} in period {i}"
                )));
            }
            if i > 0 && fix <= fixing_times[i - 1] {
                return Err(ProductError::InvalidSchedule(format!(
                    "fixing times not increasing at period {i}"
                )));
            }
        }
        let periods = fixing_times.len();
        Ok(Self {
            fixing_times,
            payment_times,
            swap_rates: vec![swap_rate; periods],
            period_notionals: vec![notional; periods],
            pay_fixed,
        })
    }

    /// Replaces the per-period notionals (amortising schedule).
    pub fn with_period_notionals(mut self, notionals: Vec<f64>) -> Result<Self, ProductError> {
        if notionals.len() != self.fixing_times.len() {
            return Err(ProductError::ScheduleMismatch {
                fixings: self.fixing_times.len(),
                payments: notionals.len(),
            });
        }
        self.period_notionals = notionals;
        Ok(self)
    }

    /// Replaces the per-period fixed rates.
    pub fn with_period_rates(mut self, rates: Vec<f64>) -> Result<Self, ProductError> {
        if rates.len() != self.fixing_times.len() {
            return Err(ProductError::ScheduleMismatch {
                fixings: self.fixing_times.len(),
                payments: rates.len(),
            });
        }
        self.swap_rates = rates;
        Ok(self)
    }

    /// Number of accrual periods.
    pub fn periods(&self) -> usize {
        self.fixing_times.len()
    }

    /// First fixing time.
    pub fn start_time(&self) -> f64 {
        self.fixing_times[0]
    }

    /// Last payment time.
    pub fn last_payment_time(&self) -> f64 {
        self.payment_times[self.periods() - 1]
    }

    /// Per-period fixing times.
    pub fn fixing_times(&self) -> &[f64] {
        &self.fixing_times
    }

    /// Per-period payment times.
    pub fn payment_times(&self) -> &[f64] {
        &self.payment_times
    }

    /// Fixed rate of the first period.
    pub fn swap_rate(&self) -> f64 {
        self.swap_rates[0]
    }

    /// +1 when receiving float (paying fixed), -1 otherwise.
    fn sign(&self) -> f64 {
        if self.pay_fixed {
            1.0
        } else {
            -1.0
        }
    }

    fn grid_index(&self, engine: &dyn RatesEngine, fixing: f64) -> Result<usize, ModelError> {
        engine
            .tenor_grid()
            .index_le(fixing)
            .ok_or(ModelError::TimeOutOfRange { time: fixing })
    }
}

impl MarginProduct for VanillaSwap {
    fn curves(&self) -> Vec<CurveKey> {
        vec![CurveKey::Ois, CurveKey::FORWARD_6M]
    }

    fn gradient(
        &self,
        engine: &dyn RatesEngine,
        _post_boundary: bool,
    ) -> Result<RiskFactorGradient, ModelError> {
        let mut gradient = RiskFactorGradient::new();
        let sign = self.sign();
        for i in 0..self.periods() {
            let fixing = self.fixing_times[i];
            let payment = self.payment_times[i];
            let dt = payment - fixing;
            let scale = sign * self.period_notionals[i] * dt;

            // Each floating payoff is linear in its own forward, so the
            // forward delta is the deflated accrual of the period.
            let grid_index = self.grid_index(engine, fixing)?;
            let deflator = engine.numeraire(payment)?.invert();
            gradient.accumulate(RiskFactorKey::Forward { grid_index }, &deflator * scale);

            // Discount-pillar delta of the time-zero payoff through the
            // log-linear bootstrap of the deflator.
            let forward_now = engine.forward_rate(0.0, grid_index)?;
            let moneyness = &forward_now - self.swap_rates[i];
            for (pillar_index, derivative) in
                engine.discount_curve().factor_derivative(payment)
            {
                gradient.accumulate(
                    RiskFactorKey::DiscountPillar { pillar_index },
                    &(&derivative * &moneyness) * scale,
                );
            }
        }
        Ok(gradient)
    }

    fn value(&self, time: f64, engine: &dyn RatesEngine) -> Result<PathValue, ModelError> {
        let numeraire = engine.numeraire(time)?;
        let mut deflated = PathValue::zero();
        for i in 0..self.periods() {
            let payment = self.payment_times[i];
            if payment <= time {
                continue;
            }
            let grid_index = self.grid_index(engine, self.fixing_times[i])?;
            let forward = engine.forward_rate(time, grid_index)?;
            let dt = payment - self.fixing_times[i];
            let scale = self.sign() * self.period_notionals[i] * dt;
            let payoff = &(&forward - self.swap_rates[i]) * scale;
            deflated = &deflated + &(&payoff * &engine.numeraire(payment)?.invert());
        }
        Ok(&numeraire * &deflated)
    }

    fn boundary(&self) -> Option<ProductBoundary> {
        if self.start_time() > 0.0 {
            Some(ProductBoundary {
                time: self.start_time(),
                pins_melting_time: true,
            })
        } else {
            None
        }
    }

    fn underlying_swap(&self) -> Option<&VanillaSwap> {
        Some(self)
    }
}
