//! Forward sensitivity transformation: from the one-time risk-factor
//! gradient to swap-rate sensitivities on the native tenor grid.
//!
//! Forward curves follow the chain dV/dS = dV/dL · dL/dS, with an optional
//! time-grid adjustment re-expressing dV/dL at an off-grid evaluation time.
//! The OIS curve follows dV/dS = dV/dP · pinv(dP/dP) · dP/dS through the
//! time-zero pillar gradient, the log-linear interpolation derivative and
//! the analytic bond-to-swap annuity Jacobian.

use simm_core::{ConditionalExpectation, PathValue};
use simm_models::{RatesEngine, RiskFactorGradient, RiskFactorKey};

use crate::error::SensitivityError;
use crate::linalg::{multiply_vec, PathMatrix};

/// Number of forward rates with fixing at or after `time`.
pub(crate) fn remaining_forwards(engine: &dyn RatesEngine, time: f64) -> usize {
    match engine.tenor_grid().index_ge(time) {
        Some(next) => engine.num_forward_rates().saturating_sub(next),
        None => 0,
    }
}

/// The sensitivities dV/dL of the deflated product value with respect to
/// the forward rates alive at `time`, conditioned on time-t information.
///
/// Off-grid, the previous period's rate is already fixed and contributes an
/// unprojected leading entry; the result is then re-expressed against
/// forwards spanning periods that start exactly at `time` through the
/// pseudo-inverted time-grid adjustment.
pub fn value_forward_rate_sensitivities(
    gradient: &RiskFactorGradient,
    engine: &dyn RatesEngine,
    projector: &ConditionalExpectation,
    time: f64,
) -> Result<Vec<PathValue>, SensitivityError> {
    let grid = engine.tenor_grid();
    let numeraire = engine.numeraire(time)?;
    let remaining = remaining_forwards(engine, time);
    let on_grid = grid.contains_time(time);
    let num_sensis = if on_grid { remaining } else { remaining + 1 };
    let mut sensitivities = Vec::with_capacity(num_sensis);

    let last_index = grid.index_le(time).unwrap_or(0);
    let first_alive = if on_grid { last_index } else { last_index + 1 };
    if !on_grid {
        // The period covering `time` fixed at the previous grid point, so
        // its sensitivity is time-t measurable as it stands.
        let fixed = gradient.derivative(&RiskFactorKey::Forward {
            grid_index: last_index,
        });
        sensitivities.push(&fixed * &numeraire);
    }
    for grid_index in first_alive..engine.num_forward_rates() {
        let dvdl = gradient.derivative(&RiskFactorKey::Forward { grid_index });
        sensitivities.push(projector.project(&(&dvdl * &numeraire)));
    }

    if on_grid {
        return Ok(sensitivities);
    }
    let adjustment = time_grid_adjustment(engine, time)?;
    Ok(multiply_vec(&sensitivities, &adjustment))
}

/// The pseudo-inverted derivative of grid forwards with respect to forwards
/// spanning periods `[time + j dt, time + (j+1) dt)`.
///
/// Identity when `time` lies on the tenor grid. Off-grid, each shifted
/// forward is the log-linear interpolation of its two bracketing grid
/// forwards; the band matrix of analytic derivatives is pseudo-inverted
/// path by path.
pub fn time_grid_adjustment(
    engine: &dyn RatesEngine,
    time: f64,
) -> Result<PathMatrix, SensitivityError> {
    let grid = engine.tenor_grid();
    let remaining = remaining_forwards(engine, time);
    if grid.contains_time(time) {
        return Ok(PathMatrix::identity(remaining));
    }

    let step = grid.first_step();
    let previous_time = grid
        .index_le(time)
        .map(|index| grid.time(index))
        .unwrap_or(0.0);

    let mut band = PathMatrix::new(remaining, remaining + 1);
    for row in 0..remaining {
        let shifted_time = time + row as f64 * step;
        let lower_index = grid.index_le(shifted_time).unwrap_or(0);
        let lower_time = grid.time(lower_index);
        let mid_time = lower_time + step;
        let upper_time = lower_time + 2.0 * step;
        let factor1 = (upper_time - (shifted_time + step)) / (upper_time - mid_time);
        let factor2 = (shifted_time - lower_time) / (mid_time - lower_time);

        // Row 0 spans the period already running at `time`; its forwards
        // fixed at the previous grid point.
        let observation = if row == 0 { previous_time } else { time };
        let lower_forward = engine.forward_rate(observation, lower_index)?;
        let upper_forward = engine.forward_rate(observation, lower_index + 1)?;

        let upper_accrual = &(&upper_forward * (upper_time - mid_time)) + 1.0;
        let lower_accrual = &(&lower_forward * (mid_time - lower_time)) + 1.0;
        let log_interpol =
            (&(&upper_accrual.ln() * (-factor1)) + &(&lower_accrual.ln() * (-factor2))).exp();

        band.set(row, row, &(&upper_accrual * &log_interpol) * (1.0 - factor2));
        band.set(
            row,
            row + 1,
            &(&lower_accrual * &log_interpol) * (1.0 - factor1),
        );
    }
    band.pseudo_inverse(engine.num_paths())
}

/// The Jacobian dL/dS of grid forwards with respect to co-starting par swap
/// rates, via the recursive annuity relations through the projector.
///
/// Bidiagonal: only the diagonal and first sub-diagonal are present.
pub fn forward_swap_jacobian(
    engine: &dyn RatesEngine,
    projector: &ConditionalExpectation,
    time: f64,
) -> Result<PathMatrix, SensitivityError> {
    let step = engine.tenor_grid().first_step();
    let n = remaining_forwards(engine, time);
    let mut jacobian = PathMatrix::new(n, n);
    if n == 0 {
        return Ok(jacobian);
    }
    jacobian.set(0, 0, PathValue::constant(1.0));

    let mut discount_time = time + step;
    let mut sum_df = engine.numeraire(discount_time)?.invert();
    for row in 1..n {
        discount_time += step;
        let df = engine.numeraire(discount_time)?.invert();
        let denominator = projector.project(&df);
        let annuity = projector.project(&sum_df);
        jacobian.set(row, row - 1, -&(&annuity / &denominator));
        sum_df = &sum_df + &df;
        let extended_annuity = projector.project(&sum_df);
        jacobian.set(row, row, &extended_annuity / &denominator);
    }
    Ok(jacobian)
}

/// dV/dS = dV/dL · dL/dS with absent-as-zero semantics.
///
/// The Jacobian may be larger than the sensitivity vector (the shared
/// time-zero Jacobian against a later evaluation time); only its top-left
/// block participates.
pub fn swap_rate_sensitivities(dvdl: &[PathValue], dlds: &PathMatrix) -> Vec<PathValue> {
    if dvdl.len() < dlds.rows() {
        multiply_vec(dvdl, &dlds.top_left(dvdl.len()))
    } else {
        multiply_vec(dvdl, dlds)
    }
}

/// Swap-rate sensitivities of the OIS discount curve:
/// dV/dS = dV/dP(pillars at or after t) · pinv(dP/dP) · dP/dS.
pub fn discount_curve_sensitivities(
    gradient: &RiskFactorGradient,
    engine: &dyn RatesEngine,
    projector: &ConditionalExpectation,
    time: f64,
) -> Result<Vec<PathValue>, SensitivityError> {
    let curve = engine.discount_curve();
    let pillars = curve.times();
    let step = engine.tenor_grid().first_step();
    let n = remaining_forwards(engine, time);
    if n == 0 || pillars.is_empty() {
        return Ok(Vec::new());
    }

    // Pillars strictly before the one covering t carry no remaining risk.
    let first_pillar = if time > pillars[0] {
        pillars.partition_point(|&p| p <= time) - 1
    } else {
        0
    };

    let dvdp: Vec<PathValue> = (first_pillar..pillars.len())
        .map(|pillar_index| gradient.derivative(&RiskFactorKey::DiscountPillar { pillar_index }))
        .collect();

    // dP(pillar)/dP(grid bond): analytic log-linear interpolation
    // derivative of each grid-maturity bond with respect to the pillar
    // factors, then pseudo-inverted.
    let mut dpdp = PathMatrix::new(n, pillars.len() - first_pillar);
    for row in 0..n {
        let discount_time = time + (row + 1) as f64 * step;
        for (pillar_index, derivative) in curve.factor_derivative(discount_time) {
            if pillar_index >= first_pillar {
                dpdp.set(row, pillar_index - first_pillar, derivative);
            }
        }
    }
    let dvdp_grid = multiply_vec(&dvdp, &dpdp.pseudo_inverse(engine.num_paths())?);

    let dpds = bond_swap_jacobian(engine, projector, time)?;
    Ok(multiply_vec(&dvdp_grid, &dpds))
}

/// The Jacobian dP/dS of grid-maturity bonds with respect to co-starting
/// par swap rates, as the inverse of the analytic annuity recursion dS/dP.
pub fn bond_swap_jacobian(
    engine: &dyn RatesEngine,
    projector: &ConditionalExpectation,
    time: f64,
) -> Result<PathMatrix, SensitivityError> {
    let step = engine.tenor_grid().first_step();
    let n = remaining_forwards(engine, time);
    let numeraire_now = engine.numeraire(time)?;

    // Row k is the par rate S_k = (1 - P_k) / A_k with A_k the running
    // annuity: dS_k/dP_k = -(A_k + 1 - P_k)/A_k^2 and, for every earlier
    // bond, dS_k/dP_j = (P_k - 1)/A_k^2.
    let mut dsdp = PathMatrix::new(n, n);
    let mut annuity = PathValue::zero();
    for swap_index in 0..n {
        let maturity = time + (swap_index + 1) as f64 * step;
        let bond =
            projector.project(&(&numeraire_now * &engine.numeraire(maturity)?.invert()));
        annuity = &annuity + &bond;
        let annuity_sq = &annuity * &annuity;
        let diagonal = &(&annuity + 1.0) - &bond;
        dsdp.set(swap_index, swap_index, -&(&diagonal / &annuity_sq));
        let off_diagonal = &(&bond - 1.0) / &annuity_sq;
        for bond_index in 0..swap_index {
            dsdp.set(swap_index, bond_index, off_diagonal.clone());
        }
    }
    dsdp.pseudo_inverse(engine.num_paths())
}
