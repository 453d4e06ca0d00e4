//! Conditional-expectation projector at an evaluation time.
//!
//! Path-wise quantities are projected onto time-t information through a
//! polynomial regression on two spanning rates observed at t: the rate over
//! the first tenor period after t and the rate to the terminal grid
//! maturity. Exercisable products additionally mask both regressors by the
//! path-wise exercise indicator, restricting the regression to paths still
//! alive at t.

use simm_core::{ConditionalExpectation, PathValue};
use simm_models::{MarginProduct, RatesEngine, RatesProduct};

use crate::error::SensitivityError;

/// Monomial order of the regression basis.
pub const DEFAULT_REGRESSION_ORDER: u32 = 2;

/// Builds the regression operator for `time`.
///
/// `product` supplies the optional path-wise exercise mask; pass `None`
/// for product-independent projections (the shared time-zero Jacobian).
pub fn build_projector(
    engine: &dyn RatesEngine,
    time: f64,
    product: Option<&RatesProduct>,
    order: u32,
) -> Result<ConditionalExpectation, SensitivityError> {
    let grid = engine.tenor_grid();

    let mut indicator = PathValue::constant(1.0);
    if let Some(product) = product {
        if let Some(exercise_time) = product.path_exercise_time(engine)? {
            // Zero on paths already exercised at `time`.
            let elapsed = &(-&exercise_time) + time;
            indicator = elapsed.choose(&PathValue::zero(), &indicator);
        }
    }

    let short_end = (time + grid.first_step()).min(grid.last_time());
    let short_rate = engine.spanning_rate(time, time, short_end)?;
    let long_rate = engine.spanning_rate(time, time, grid.last_time())?;
    let regressors = [&short_rate * &indicator, &long_rate * &indicator];

    Ok(ConditionalExpectation::with_monomials(
        &regressors,
        order,
        engine.num_paths(),
    )?)
}
