//! Melting and interpolation against exact recomputation.
//!
//! The approximation modes must be exact at their anchor times, decay
//! monotonically between anchors, and vanish once the product's last
//! cash flow has passed.

use approx::assert_relative_eq;

use simm_core::{CurveKey, LogLinearCurve, PathValue, RiskClass};
use simm_models::{
    BermudanSwaption, LognormalForwardModel, LognormalModelParams, RatesProduct, VanillaSwap,
};
use simm_sensitivity::{PortfolioConfig, SensitivityMode, SimmPortfolio};

const NUM_PATHS: usize = 8;

fn deterministic_engine() -> LognormalForwardModel {
    let params = LognormalModelParams::new(0.5, vec![0.02; 12], 0.0, NUM_PATHS, 11);
    let times: Vec<f64> = vec![0.5, 1.0, 2.0, 6.0];
    let factors = times
        .iter()
        .map(|t| PathValue::constant((-0.02 * t).exp()))
        .collect();
    let curve = LogLinearCurve::new(times, factors).unwrap();
    LognormalForwardModel::new(params, curve).unwrap()
}

/// A five-year semiannual payer swap struck at 2%.
fn payer_swap_5y() -> RatesProduct {
    let fixings: Vec<f64> = (0..10).map(|i| i as f64 * 0.5).collect();
    let payments: Vec<f64> = (1..=10).map(|i| i as f64 * 0.5).collect();
    RatesProduct::Swap(VanillaSwap::new(fixings, payments, 0.02, 1.0, true).unwrap())
}

fn bucket_averages(
    engine: &LognormalForwardModel,
    mode: SensitivityMode,
    times: &[f64],
) -> Vec<Vec<f64>> {
    let config = PortfolioConfig::default().with_sensitivity_mode(mode);
    let mut portfolio = SimmPortfolio::new(vec![payer_swap_5y()], config);
    portfolio.attach_model(engine).unwrap();
    times
        .iter()
        .map(|&t| {
            portfolio
                .bucket_sensitivities(0, RiskClass::InterestRate, CurveKey::FORWARD_6M, t)
                .unwrap()
                .averages()
        })
        .collect()
}

// ============================================================================
// Anchor exactness
// ============================================================================

#[test]
fn test_melting_equals_exact_at_anchor_times() {
    let engine = deterministic_engine();
    let exact = bucket_averages(&engine, SensitivityMode::Exact, &[1.0]);
    let melted = bucket_averages(&engine, SensitivityMode::MeltingOnBuckets, &[1.0]);
    for (e, m) in exact[0].iter().zip(&melted[0]) {
        assert_relative_eq!(*e, *m, epsilon = 1e-10, max_relative = 1e-10);
    }
}

#[test]
fn test_interpolation_equals_exact_at_anchor_times() {
    let engine = deterministic_engine();
    let exact = bucket_averages(&engine, SensitivityMode::Exact, &[1.0]);
    let interpolated = bucket_averages(&engine, SensitivityMode::Interpolation, &[1.0]);
    for (e, i) in exact[0].iter().zip(&interpolated[0]) {
        assert_relative_eq!(*e, *i, epsilon = 1e-10, max_relative = 1e-10);
    }
}

#[test]
fn test_interpolation_is_linear_between_anchors() {
    let engine = deterministic_engine();
    let exact = bucket_averages(&engine, SensitivityMode::Exact, &[1.0, 2.0]);
    let interpolated = bucket_averages(&engine, SensitivityMode::Interpolation, &[1.5]);
    for (bucket, value) in interpolated[0].iter().enumerate() {
        let expected = 0.5 * (exact[0][bucket] + exact[1][bucket]);
        assert_relative_eq!(*value, expected, epsilon = 1e-10, max_relative = 1e-10);
    }
}

// ============================================================================
// Decay
// ============================================================================

#[test]
fn test_melting_decays_between_anchors() {
    let engine = deterministic_engine();
    let results =
        bucket_averages(&engine, SensitivityMode::MeltingOnBuckets, &[1.0, 1.25, 1.75]);
    let totals: Vec<f64> = results.iter().map(|r| r.iter().sum()).collect();
    assert!(totals[0] > 0.0, "payer swap must carry positive delta");
    assert!(totals[1] < totals[0], "melting must shrink total delta");
    assert!(totals[2] < totals[1], "melting must keep shrinking");
}

#[test]
fn test_sensitivities_vanish_after_last_payment() {
    let engine = deterministic_engine();
    let results = bucket_averages(&engine, SensitivityMode::MeltingOnBuckets, &[5.0]);
    for value in &results[0] {
        assert_relative_eq!(*value, 0.0, epsilon = 1e-12);
    }
}

// ============================================================================
// Bermudan re-accumulation across exercise dates
// ============================================================================

#[test]
fn test_bermudan_reaccumulates_and_stays_short_dated() {
    let engine = deterministic_engine();
    let fixings = vec![1.0, 1.5, 2.0, 2.5];
    let payments = vec![1.5, 2.0, 2.5, 3.0];
    // Struck far below the curve, every path exercises at the first date.
    let underlying = VanillaSwap::new(fixings, payments, 0.001, 1.0, true).unwrap();
    let product =
        RatesProduct::Bermudan(BermudanSwaption::new(underlying, vec![1.0, 2.0]).unwrap());

    let config =
        PortfolioConfig::default().with_sensitivity_mode(SensitivityMode::MeltingOnBuckets);
    let mut portfolio = SimmPortfolio::new(vec![product], config);
    portfolio.attach_model(&engine).unwrap();

    let before = portfolio
        .bucket_sensitivities(0, RiskClass::InterestRate, CurveKey::FORWARD_6M, 0.5)
        .unwrap()
        .averages();
    let after = portfolio
        .bucket_sensitivities(0, RiskClass::InterestRate, CurveKey::FORWARD_6M, 1.25)
        .unwrap()
        .averages();

    let mass_before: f64 = before.iter().sum();
    let mass_after: f64 = after.iter().sum();
    assert!(mass_before > 0.0, "deep in-the-money payer swaption has delta");
    assert!(mass_after > 0.0, "delivered swap keeps its delta after exercise");

    // The delivered schedule runs out 1.75y past the evaluation time, so
    // everything from the 3y bucket on is empty.
    for value in &after[6..] {
        assert_relative_eq!(*value, 0.0, epsilon = 1e-12);
    }
}
