//! Pillar-based discount curve with log-linear interpolation.
//!
//! The curve interpolates linearly in the zero rate (log discount factor
//! per unit time), matching the convention of the calibrated market curve.
//! Interpolation derivatives with respect to the pillar discount factors
//! are analytic, never finite-differenced; they feed the pillar-to-grid
//! stage of the discount-curve sensitivity chain.

use thiserror::Error;

use crate::types::PathValue;

/// Errors from constructing or querying a pillar curve.
#[derive(Debug, Error)]
pub enum CurveError {
    /// Pillar times and factors differ in length.
    #[error("curve pillar mismatch: {times} times vs {factors} factors")]
    LengthMismatch {
        /// Number of pillar times.
        times: usize,
        /// Number of pillar factors.
        factors: usize,
    },

    /// Pillar times must be strictly positive and strictly increasing.
    #[error("invalid curve pillars: {0}")]
    InvalidPillars(String),
}

/// A discount curve parametrised by discount factors at fixed pillar times.
///
/// Pillar factors are path-wise values: the time-zero market curve stores
/// broadcastable constants, while shifted or simulated curves may carry a
/// full path vector per pillar.
#[derive(Clone, Debug)]
pub struct LogLinearCurve {
    times: Vec<f64>,
    factors: Vec<PathValue>,
}

impl LogLinearCurve {
    /// Creates a curve from pillar times (year fractions, strictly positive
    /// and increasing) and their discount factors.
    pub fn new(times: Vec<f64>, factors: Vec<PathValue>) -> Result<Self, CurveError> {
        if times.len() != factors.len() {
            return Err(CurveError::LengthMismatch {
                times: times.len(),
                factors: factors.len(),
            });
        }
        if times.is_empty() {
            return Err(CurveError::InvalidPillars("no pillars".to_string()));
        }
        if times[0] <= 0.0 {
            return Err(CurveError::InvalidPillars(format!(
                "first pillar must be positive, got {}",
                times[0]
            )));
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(CurveError::InvalidPillars(
                "pillar times must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { times, factors })
    }

    /// Pillar times.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Discount factor at a pillar index.
    pub fn pillar_factor(&self, index: usize) -> &PathValue {
        &self.factors[index]
    }

    /// Number of pillars.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the curve has no pillars.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Bracketing segment for an interpolation time: `(lower, upper, delta)`
    /// with `delta` the relative position in `[t_lower, t_upper]`.
    /// Times beyond the last pillar extrapolate on the last segment.
    fn segment(&self, time: f64) -> (usize, usize, f64) {
        let last_segment = self.times.len().saturating_sub(2);
        let lower = self
            .times
            .iter()
            .rposition(|t| *t <= time)
            .unwrap_or(0)
            .min(last_segment);
        let upper = lower + 1;
        let delta = (time - self.times[lower]) / (self.times[upper] - self.times[lower]);
        (lower, upper, delta)
    }

    /// Interpolated discount factor at `time`.
    ///
    /// Below the first pillar the zero rate is extrapolated quadratically in
    /// time, matching the short-end convention of the pillar gradient chain.
    pub fn discount_factor(&self, time: f64) -> PathValue {
        if self.times.len() == 1 || time < self.times[0] {
            let anchor = &self.factors[0];
            let term = (time / self.times[0]).powi(2);
            return (&anchor.ln() * term).exp();
        }
        let (lower, upper, delta) = self.segment(time);
        let log_lower = &self.factors[lower].ln() * ((1.0 - delta) / self.times[lower]);
        let log_upper = &self.factors[upper].ln() * (delta / self.times[upper]);
        (&(&log_lower + &log_upper) * time).exp()
    }

    /// Analytic derivative of the interpolated discount factor at `time`
    /// with respect to each pillar factor.
    ///
    /// Returns at most two `(pillar_index, derivative)` entries; pillars not
    /// listed have zero derivative.
    pub fn factor_derivative(&self, time: f64) -> Vec<(usize, PathValue)> {
        let value = self.discount_factor(time);
        if self.times.len() == 1 || time < self.times[0] {
            let term = (time / self.times[0]).powi(2);
            return vec![(0, &(&value / &self.factors[0]) * term)];
        }
        let (lower, upper, delta) = self.segment(time);
        let d_lower = &(&value / &self.factors[lower]) * ((1.0 - delta) * time / self.times[lower]);
        let d_upper = &(&value / &self.factors[upper]) * (delta * time / self.times[upper]);
        vec![(lower, d_lower), (upper, d_upper)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat_curve() -> LogLinearCurve {
        // Flat 2% zero curve: P(t) = exp(-0.02 t).
        let times: Vec<f64> = vec![0.5, 1.0, 2.0, 5.0, 30.0];
        let factors = times
            .iter()
            .map(|t| PathValue::constant((-0.02 * t).exp()))
            .collect();
        LogLinearCurve::new(times, factors).unwrap()
    }

    #[test]
    fn test_construction_validation() {
        assert!(LogLinearCurve::new(vec![1.0], vec![]).is_err());
        assert!(LogLinearCurve::new(vec![], vec![]).is_err());
        assert!(LogLinearCurve::new(vec![0.0], vec![PathValue::constant(1.0)]).is_err());
        assert!(LogLinearCurve::new(
            vec![1.0, 1.0],
            vec![PathValue::constant(1.0), PathValue::constant(0.9)]
        )
        .is_err());
    }

    #[test]
    fn test_pillar_times_reproduced() {
        let curve = flat_curve();
        for (i, t) in curve.times().to_vec().iter().enumerate() {
            assert_relative_eq!(
                curve.discount_factor(*t).average(),
                curve.pillar_factor(i).average(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_flat_curve_interpolates_flat() {
        let curve = flat_curve();
        // Zero-rate interpolation of a flat curve is exact everywhere.
        for t in [0.75, 1.5, 3.0, 10.0] {
            assert_relative_eq!(
                curve.discount_factor(t).average(),
                (-0.02f64 * t).exp(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let times: Vec<f64> = vec![0.5, 1.0, 2.0, 5.0];
        let factors = vec![0.99, 0.97, 0.93, 0.85];
        let curve = LogLinearCurve::new(
            times.clone(),
            factors.iter().map(|f| PathValue::constant(*f)).collect(),
        )
        .unwrap();

        let t = 1.6;
        let analytic = curve.factor_derivative(t);
        let shift = 1e-7;
        for (pillar, derivative) in &analytic {
            let mut bumped = factors.clone();
            bumped[*pillar] += shift;
            let bumped_curve = LogLinearCurve::new(
                times.clone(),
                bumped.iter().map(|f| PathValue::constant(*f)).collect(),
            )
            .unwrap();
            let fd = (bumped_curve.discount_factor(t).average()
                - curve.discount_factor(t).average())
                / shift;
            assert_relative_eq!(derivative.average(), fd, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_short_end_derivative_on_first_pillar() {
        let curve = flat_curve();
        let derivative = curve.factor_derivative(0.25);
        assert_eq!(derivative.len(), 1);
        assert_eq!(derivative[0].0, 0);
        assert!(derivative[0].1.average() > 0.0);
    }
}
