//! Linear sensitivity melting between exact recomputation anchors.
//!
//! Melting approximates how a sensitivity profile decays as time passes
//! without re-running the transformation: each bucket shrinks linearly
//! toward zero at its own maturity, survivors are re-bucketed at their
//! shifted day offsets and buckets whose maturity has passed are dropped.

use simm_core::{day_offset, PathValue, RiskClass, TimeGrid};

use crate::buckets::{bucket_count, bucket_days, sensitivities_on_buckets};

/// Melts bucketed sensitivities from `initial_time` to `evaluation_time`.
///
/// `sensitivities` must be on the regulatory bucket axis of `risk_class`.
/// At `evaluation_time == initial_time` this is the identity.
pub fn melted_on_buckets(
    initial_time: f64,
    evaluation_time: f64,
    sensitivities: &[PathValue],
    risk_class: RiskClass,
) -> Vec<PathValue> {
    let vertices = bucket_days(risk_class);
    debug_assert_eq!(sensitivities.len(), vertices.len());
    let elapsed_days = day_offset(evaluation_time - initial_time);

    // Buckets whose maturity has passed carry no sensitivity anymore.
    let first_alive = vertices.partition_point(|&d| d <= elapsed_days);
    if first_alive == vertices.len() {
        return vec![PathValue::zero(); vertices.len()];
    }

    let shifted_days: Vec<i64> = vertices[first_alive..]
        .iter()
        .map(|&d| d - elapsed_days)
        .collect();
    let melted: Vec<PathValue> = (first_alive..vertices.len())
        .map(|i| &sensitivities[i] * (1.0 - elapsed_days as f64 / vertices[i] as f64))
        .collect();
    sensitivities_on_buckets(&melted, risk_class, &shifted_days)
}

/// Melts native-grid sensitivities, keeping the result on the native axis:
/// entry `i` of the output belongs to the tenor maturing `(i + 1)` periods
/// past `evaluation_time`.
pub(crate) fn melt_native(
    initial_time: f64,
    evaluation_time: f64,
    sensitivities: &[PathValue],
    grid: &TimeGrid,
) -> Vec<PathValue> {
    let step = grid.first_step();
    let elapsed = evaluation_time - initial_time;
    let first_alive = if elapsed == 0.0 {
        1
    } else {
        match grid.index_ge(elapsed) {
            Some(index) => index,
            None => return Vec::new(),
        }
    };
    if first_alive > sensitivities.len() {
        return Vec::new();
    }

    (0..sensitivities.len() - first_alive + 1)
        .map(|i| {
            let maturity = (i + first_alive) as f64 * step;
            &sensitivities[i + first_alive - 1] * (1.0 - elapsed / maturity)
        })
        .collect()
}

/// Melts native-grid sensitivities against their grid maturities, then maps
/// the survivors onto the regulatory buckets.
pub fn melted_on_grid(
    initial_time: f64,
    evaluation_time: f64,
    sensitivities: &[PathValue],
    grid: &TimeGrid,
    risk_class: RiskClass,
) -> Vec<PathValue> {
    let melted = melt_native(initial_time, evaluation_time, sensitivities, grid);
    if melted.is_empty() {
        return vec![PathValue::zero(); bucket_count(risk_class)];
    }
    let step = grid.first_step();
    let native_days: Vec<i64> = (0..melted.len())
        .map(|i| day_offset((i + 1) as f64 * step))
        .collect();
    sensitivities_on_buckets(&melted, risk_class, &native_days)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn bucketed_unit(bucket: usize) -> Vec<PathValue> {
        let mut values = vec![PathValue::zero(); 12];
        values[bucket] = PathValue::constant(1.0);
        values
    }

    #[test]
    fn test_melting_is_identity_at_zero_elapsed_time() {
        let sensis: Vec<PathValue> =
            (0..12).map(|i| PathValue::constant(i as f64)).collect();
        let melted = melted_on_buckets(1.5, 1.5, &sensis, RiskClass::InterestRate);
        for (before, after) in sensis.iter().zip(&melted) {
            assert_relative_eq!(before.get(0), after.get(0), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_bucket_dropped_at_its_maturity() {
        // All mass in the 1y bucket; a year later it has fully decayed.
        let melted =
            melted_on_buckets(0.0, 1.0, &bucketed_unit(4), RiskClass::InterestRate);
        let total: f64 = melted.iter().map(|v| v.get(0)).sum();
        assert_relative_eq!(total, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_melting_decays_monotonically() {
        // The 10y bucket melting over successive quarters.
        let sensis = bucketed_unit(8);
        let mut previous = f64::INFINITY;
        for quarter in 0..8 {
            let time = quarter as f64 * 0.25;
            let melted = melted_on_buckets(0.0, time, &sensis, RiskClass::InterestRate);
            let total: f64 = melted.iter().map(|v| v.get(0)).sum();
            assert!(total <= previous + 1e-12, "mass grew at t={time}");
            previous = total;
        }
    }

    #[test]
    fn test_melted_mass_rebuckets_at_shifted_offsets() {
        // Half a year into melting, 2y (730d) mass shifts to 730-183=547d,
        // splitting between the 1y and 2y buckets.
        let melted =
            melted_on_buckets(0.0, 0.5, &bucketed_unit(5), RiskClass::InterestRate);
        let expected_scale = 1.0 - 183.0 / 730.0;
        let lower_weight = (730.0 - 547.0) / 365.0;
        assert_relative_eq!(
            melted[4].get(0),
            expected_scale * lower_weight,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            melted[5].get(0),
            expected_scale * (1.0 - lower_weight),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_native_grid_melting_maps_to_buckets() {
        let grid = TimeGrid::regular(0.0, 8, 0.5);
        let sensis = vec![PathValue::constant(1.0); 8];
        let melted = melted_on_grid(0.0, 0.25, &sensis, &grid, RiskClass::InterestRate);
        assert_eq!(melted.len(), 12);
        let total: f64 = melted.iter().map(|v| v.get(0)).sum();
        assert!(total > 0.0 && total < 8.0);
    }

    #[test]
    fn test_native_grid_melting_far_past_terminal_is_zero() {
        let grid = TimeGrid::regular(0.0, 4, 0.5);
        let sensis = vec![PathValue::constant(1.0); 4];
        let melted = melted_on_grid(0.0, 10.0, &sensis, &grid, RiskClass::InterestRate);
        let total: f64 = melted.iter().map(|v| v.get(0)).sum();
        assert_relative_eq!(total, 0.0, epsilon = 1e-12);
    }
}
