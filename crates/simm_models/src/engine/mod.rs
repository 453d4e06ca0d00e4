//! Monte Carlo forward-rate engine interface.
//!
//! The sensitivity pipeline consumes the path simulation exclusively
//! through [`RatesEngine`]; model dynamics are not specified here. The
//! crate ships [`LognormalForwardModel`] as a seeded reference
//! implementation for tests and demos.

mod lognormal;

pub use lognormal::{LognormalForwardModel, LognormalModelParams};

use simm_core::{LogLinearCurve, PathValue, TimeGrid};

use crate::error::ModelError;

/// A path-wise interest-rate simulation.
///
/// Forward rates live on a regular native tenor grid: rate `i` spans
/// `[t_i, t_{i+1}]` and is fixed at `t_i`. All returned quantities are
/// path-wise with the engine's path count.
pub trait RatesEngine {
    /// The native tenor grid `t_0 = 0, ..., t_n`.
    fn tenor_grid(&self) -> &TimeGrid;

    /// Number of simulated paths.
    fn num_paths(&self) -> usize;

    /// Number of forward rates on the native grid.
    fn num_forward_rates(&self) -> usize {
        self.tenor_grid().len() - 1
    }

    /// Forward rate `index` as observed at `time`.
    ///
    /// Rates are frozen at their fixing: observation times past `t_index`
    /// return the rate fixed at `t_index`.
    fn forward_rate(&self, time: f64, index: usize) -> Result<PathValue, ModelError>;

    /// Simple forward rate spanning `[start, end]` as observed at `time`.
    ///
    /// Used for regression basis processes (short-tenor and full-tenor
    /// regressors).
    fn spanning_rate(&self, time: f64, start: f64, end: f64) -> Result<PathValue, ModelError>;

    /// Numeraire at `time` (path-wise, with reciprocal via
    /// [`PathValue::invert`]).
    fn numeraire(&self, time: f64) -> Result<PathValue, ModelError>;

    /// The time-zero discount (OIS) curve with its pillars.
    fn discount_curve(&self) -> &LogLinearCurve;
}
