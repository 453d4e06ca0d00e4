//! Time discretisations and day-count canonicalisation.
//!
//! Evaluation times are year fractions. Cache keys and regulatory bucket
//! thresholds are act/365 day offsets obtained through [`day_offset`], the
//! single place where the day-count convention is applied.

/// Days per year under the act/365 convention used for bucket thresholds.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Tolerance for time comparisons on a grid.
const TIME_EPS: f64 = 1e-10;

/// Canonicalises a year-fraction time to an act/365 day offset.
///
/// Used both for regulatory bucket day thresholds and for snapshot cache
/// keys, avoiding floating-point times as map keys.
pub fn day_offset(time: f64) -> i64 {
    (DAYS_PER_YEAR * time).round() as i64
}

/// An increasing discretisation of time points.
///
/// Used for the model's native tenor grid, discount-curve pillars and the
/// exact-recomputation reset grid.
///
/// # Examples
///
/// ```
/// use simm_core::TimeGrid;
///
/// let grid = TimeGrid::regular(0.0, 4, 0.5);
/// assert_eq!(grid.len(), 5);
/// assert_eq!(grid.index_le(1.2), Some(2));
/// assert_eq!(grid.index_ge(1.2), Some(3));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TimeGrid {
    times: Vec<f64>,
}

impl TimeGrid {
    /// Creates a regular grid `initial, initial + step, ..., initial + n * step`.
    pub fn regular(initial: f64, num_steps: usize, step: f64) -> Self {
        let times = (0..=num_steps).map(|i| initial + i as f64 * step).collect();
        Self { times }
    }

    /// Creates a grid from explicit time points. Points are sorted.
    pub fn from_times(mut times: Vec<f64>) -> Self {
        times.sort_by(|a, b| a.partial_cmp(b).expect("non-finite grid time"));
        Self { times }
    }

    /// Number of time points.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the grid has no points.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Time at a given index.
    pub fn time(&self, index: usize) -> f64 {
        self.times[index]
    }

    /// All time points.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Last time point.
    pub fn last_time(&self) -> f64 {
        *self.times.last().expect("empty time grid")
    }

    /// Step between consecutive points starting at `index`.
    pub fn step(&self, index: usize) -> f64 {
        self.times[index + 1] - self.times[index]
    }

    /// Step of the first period. The native tenor grids used by the engine
    /// are regular, so this is *the* period length.
    pub fn first_step(&self) -> f64 {
        self.step(0)
    }

    /// Index of the largest time point `<= time`, or `None` if `time` lies
    /// before the grid.
    pub fn index_le(&self, time: f64) -> Option<usize> {
        let mut result = None;
        for (i, t) in self.times.iter().enumerate() {
            if *t <= time + TIME_EPS {
                result = Some(i);
            } else {
                break;
            }
        }
        result
    }

    /// Index of the smallest time point `>= time`, or `None` if `time` lies
    /// beyond the grid.
    pub fn index_ge(&self, time: f64) -> Option<usize> {
        self.times.iter().position(|t| *t >= time - TIME_EPS)
    }

    /// Whether `time` coincides with a grid point (within tolerance).
    pub fn contains_time(&self, time: f64) -> bool {
        self.times.iter().any(|t| (t - time).abs() <= TIME_EPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_regular_grid() {
        let grid = TimeGrid::regular(0.0, 10, 0.5);
        assert_eq!(grid.len(), 11);
        assert_relative_eq!(grid.time(3), 1.5);
        assert_relative_eq!(grid.first_step(), 0.5);
        assert_relative_eq!(grid.last_time(), 5.0);
    }

    #[test]
    fn test_from_times_sorts() {
        let grid = TimeGrid::from_times(vec![2.0, 0.5, 1.0]);
        assert_relative_eq!(grid.time(0), 0.5);
        assert_relative_eq!(grid.time(2), 2.0);
    }

    #[test]
    fn test_index_lookups() {
        let grid = TimeGrid::regular(0.0, 4, 0.5);
        assert_eq!(grid.index_le(0.75), Some(1));
        assert_eq!(grid.index_le(0.5), Some(1));
        assert_eq!(grid.index_le(-0.1), None);
        assert_eq!(grid.index_ge(0.75), Some(2));
        assert_eq!(grid.index_ge(0.5), Some(1));
        assert_eq!(grid.index_ge(2.5), None);
    }

    #[test]
    fn test_contains_time() {
        let grid = TimeGrid::regular(0.0, 4, 0.5);
        assert!(grid.contains_time(1.5));
        assert!(!grid.contains_time(1.25));
    }

    #[test]
    fn test_day_offset_act365() {
        assert_eq!(day_offset(1.0), 365);
        assert_eq!(day_offset(0.5), 183); // round(182.5)
        assert_eq!(day_offset(0.0), 0);
        assert_eq!(day_offset(30.0), 10950);
    }
}
