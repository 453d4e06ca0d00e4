//! Regulatory maturity buckets and the mass-conserving bucket mapper.

use simm_core::{PathValue, RiskClass};

/// SIMM interest-rate vertices in act/365 days (2w ... 30y).
pub const IR_BUCKET_DAYS: [i64; 12] = [
    14, 30, 90, 180, 365, 730, 1095, 1825, 3650, 5475, 7300, 10950,
];

/// SIMM credit vertices in act/365 days (1y ... 10y).
pub const CREDIT_BUCKET_DAYS: [i64; 5] = [365, 730, 1095, 1825, 3650];

const IR_BUCKET_LABELS: [&str; 12] = [
    "2w", "1m", "3m", "6m", "1y", "2y", "3y", "5y", "10y", "15y", "20y", "30y",
];

const CREDIT_BUCKET_LABELS: [&str; 5] = ["1y", "2y", "3y", "5y", "10y"];

/// Bucket day thresholds for a risk class.
pub fn bucket_days(risk_class: RiskClass) -> &'static [i64] {
    match risk_class {
        RiskClass::CreditQ | RiskClass::CreditNonQ => &CREDIT_BUCKET_DAYS,
        _ => &IR_BUCKET_DAYS,
    }
}

/// Human-readable bucket labels for a risk class.
pub fn bucket_labels(risk_class: RiskClass) -> &'static [&'static str] {
    match risk_class {
        RiskClass::CreditQ | RiskClass::CreditNonQ => &CREDIT_BUCKET_LABELS,
        _ => &IR_BUCKET_LABELS,
    }
}

/// Number of maturity buckets for a risk class.
pub fn bucket_count(risk_class: RiskClass) -> usize {
    bucket_days(risk_class).len()
}

/// Redistributes sensitivities at arbitrary day offsets onto the fixed
/// regulatory buckets.
///
/// Each entry is split linearly between the two vertices bracketing its day
/// offset, so the total sensitivity mass is conserved. Entries before the
/// first vertex accrue entirely to the first bucket, entries at or past the
/// last vertex entirely to the last.
pub fn sensitivities_on_buckets(
    sensitivities: &[PathValue],
    risk_class: RiskClass,
    risk_factor_days: &[i64],
) -> Vec<PathValue> {
    debug_assert_eq!(sensitivities.len(), risk_factor_days.len());
    let vertices = bucket_days(risk_class);
    let last = vertices.len() - 1;
    let mut bucketed = vec![PathValue::zero(); vertices.len()];

    for (value, &day) in sensitivities.iter().zip(risk_factor_days) {
        if day < vertices[0] {
            bucketed[0] = &bucketed[0] + value;
        } else if day >= vertices[last] {
            bucketed[last] = &bucketed[last] + value;
        } else {
            let upper = vertices.partition_point(|&v| v <= day);
            let lower = upper - 1;
            let span = (vertices[upper] - vertices[lower]) as f64;
            let weight_lower = (vertices[upper] - day) as f64 / span;
            bucketed[lower] = bucketed[lower].add_product(value, &PathValue::constant(weight_lower));
            bucketed[upper] =
                bucketed[upper].add_product(value, &PathValue::constant(1.0 - weight_lower));
        }
    }
    bucketed
}

/// Sensitivities on an ordered axis (native tenor grid or regulatory
/// buckets), one path-wise value per node.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensitivityVector {
    values: Vec<PathValue>,
}

impl SensitivityVector {
    /// Wraps a vector of per-node sensitivities.
    pub fn new(values: Vec<PathValue>) -> Self {
        Self { values }
    }

    /// An all-zero vector on the bucket axis of a risk class.
    pub fn zero_buckets(risk_class: RiskClass) -> Self {
        Self::new(vec![PathValue::zero(); bucket_count(risk_class)])
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector has no nodes.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The sensitivity at one node.
    pub fn get(&self, index: usize) -> &PathValue {
        &self.values[index]
    }

    /// All per-node sensitivities in axis order.
    pub fn values(&self) -> &[PathValue] {
        &self.values
    }

    /// Cross-path averages per node, for reporting.
    pub fn averages(&self) -> Vec<f64> {
        self.values.iter().map(PathValue::average).collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_bucket_tables() {
        assert_eq!(bucket_count(RiskClass::InterestRate), 12);
        assert_eq!(bucket_count(RiskClass::CreditQ), 5);
        assert_eq!(bucket_labels(RiskClass::InterestRate)[0], "2w");
        assert_eq!(bucket_labels(RiskClass::CreditQ)[4], "10y");
    }

    #[test]
    fn test_exact_vertex_maps_to_single_bucket() {
        let sensis = [PathValue::constant(5.0)];
        let bucketed = sensitivities_on_buckets(&sensis, RiskClass::InterestRate, &[365]);
        assert_relative_eq!(bucketed[4].get(0), 5.0);
        assert_relative_eq!(bucketed[3].get(0), 0.0);
        assert_relative_eq!(bucketed[5].get(0), 0.0);
    }

    #[test]
    fn test_interior_day_splits_linearly() {
        // 548 days sits between the 1y (365) and 2y (730) vertices.
        let sensis = [PathValue::constant(1.0)];
        let bucketed = sensitivities_on_buckets(&sensis, RiskClass::InterestRate, &[548]);
        let lower = (730.0 - 548.0) / 365.0;
        assert_relative_eq!(bucketed[4].get(0), lower, epsilon = 1e-12);
        assert_relative_eq!(bucketed[5].get(0), 1.0 - lower, epsilon = 1e-12);
    }

    #[test]
    fn test_edges_clamp() {
        let sensis = [PathValue::constant(2.0), PathValue::constant(3.0)];
        let bucketed = sensitivities_on_buckets(&sensis, RiskClass::InterestRate, &[7, 20000]);
        assert_relative_eq!(bucketed[0].get(0), 2.0);
        assert_relative_eq!(bucketed[11].get(0), 3.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_sensitivity_vector_serde_roundtrip() {
        let vector = SensitivityVector::new(vec![
            PathValue::constant(0.5),
            PathValue::from_values(vec![1.0, -2.0]),
        ]);
        let json = serde_json::to_string(&vector).unwrap();
        let back: SensitivityVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), vector.len());
        for (a, b) in back.values().iter().zip(vector.values()) {
            assert_eq!(a, b);
        }
    }

    proptest! {
        #[test]
        fn prop_bucket_mass_is_conserved(
            values in proptest::collection::vec(-1e6f64..1e6, 1..20),
            days in proptest::collection::vec(1i64..12000, 1..20),
        ) {
            let n = values.len().min(days.len());
            let sensis: Vec<PathValue> =
                values[..n].iter().map(|&v| PathValue::constant(v)).collect();
            let bucketed =
                sensitivities_on_buckets(&sensis, RiskClass::InterestRate, &days[..n]);
            let mass_in: f64 = values[..n].iter().sum();
            let mass_out: f64 = bucketed.iter().map(|b| b.get(0)).sum();
            prop_assert!((mass_in - mass_out).abs() <= 1e-6 * (1.0 + mass_in.abs()));
        }
    }
}
