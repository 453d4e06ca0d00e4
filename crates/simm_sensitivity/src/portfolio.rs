//! The portfolio facade: SIMM bucket sensitivities per product, curve and
//! evaluation time.
//!
//! Drives the whole pipeline: gradient lookup, forward transformation,
//! bucket mapping, snapshot caching with lifecycle boundaries, melting or
//! interpolation between exact anchors, and survival damping for
//! cancelable products. Evaluation times must be nondecreasing per
//! instrument once a lifecycle boundary has been crossed.

use tracing::debug;

use simm_core::{day_offset, PathValue, RiskClass};
use simm_core::{ConditionalExpectation, CurveKey};
use simm_models::{MarginProduct, RatesEngine, RiskFactorGradient, RiskFactorKey};
use simm_models::RatesProduct;

use crate::buckets::{bucket_count, sensitivities_on_buckets, SensitivityVector};
use crate::cache::{LifecyclePhase, SensitivitySnapshot, SnapshotKey, SnapshotKind};
use crate::error::SensitivityError;
use crate::instrument::InstrumentState;
use crate::linalg::PathMatrix;
use crate::melting::{melt_native, melted_on_buckets, melted_on_grid};
use crate::projector::build_projector;
use crate::transform::{
    discount_curve_sensitivities, forward_swap_jacobian, swap_rate_sensitivities,
    value_forward_rate_sensitivities,
};

const ANCHOR_EPS: f64 = 1e-10;
const EXERCISE_EPS: f64 = 1e-4;

/// How sensitivities at times between exact anchors are produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensitivityMode {
    /// Full recomputation at every evaluation time.
    Exact,
    /// Linear melting of bucketed anchor sensitivities.
    MeltingOnBuckets,
    /// Linear melting against native grid maturities, bucketed afterwards.
    MeltingOnGrid,
    /// Linear interpolation between the two anchors bracketing t, falling
    /// back to melting past the product's terminal interpolation time.
    Interpolation,
}

/// How the forward-to-swap-rate Jacobian dL/dS is treated over time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeightMode {
    /// Computed once at t = 0 and shared read-only across instruments.
    Constant,
    /// Recomputed at every evaluation time.
    Stochastic,
}

/// Portfolio configuration.
#[derive(Clone, Copy, Debug)]
pub struct PortfolioConfig {
    /// Approximation mode between exact anchors.
    pub sensitivity_mode: SensitivityMode,
    /// Treatment of the dL/dS Jacobian.
    pub weight_mode: WeightMode,
    /// Spacing of the exact recomputation anchors (year fraction).
    pub reset_step_years: f64,
    /// Monomial order of the projection basis.
    pub regression_order: u32,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            sensitivity_mode: SensitivityMode::Exact,
            weight_mode: WeightMode::Constant,
            reset_step_years: 1.0,
            regression_order: 2,
        }
    }
}

impl PortfolioConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sensitivity mode.
    pub fn with_sensitivity_mode(mut self, mode: SensitivityMode) -> Self {
        self.sensitivity_mode = mode;
        self
    }

    /// Sets the weight mode.
    pub fn with_weight_mode(mut self, mode: WeightMode) -> Self {
        self.weight_mode = mode;
        self
    }

    /// Sets the anchor spacing.
    pub fn with_reset_step_years(mut self, step: f64) -> Self {
        self.reset_step_years = step;
        self
    }

    /// Sets the regression order.
    pub fn with_regression_order(mut self, order: u32) -> Self {
        self.regression_order = order;
        self
    }
}

/// A portfolio of instruments with per-instrument sensitivity state.
pub struct SimmPortfolio<'m> {
    instruments: Vec<InstrumentState>,
    config: PortfolioConfig,
    engine: Option<&'m dyn RatesEngine>,
    /// Shared time-zero dL/dS under [`WeightMode::Constant`].
    constant_weights: Option<PathMatrix>,
}

impl<'m> SimmPortfolio<'m> {
    /// Builds a portfolio; a model must be attached before evaluation.
    pub fn new(products: Vec<RatesProduct>, config: PortfolioConfig) -> Self {
        Self {
            instruments: products.into_iter().map(InstrumentState::new).collect(),
            config,
            engine: None,
            constant_weights: None,
        }
    }

    /// Number of instruments.
    pub fn num_products(&self) -> usize {
        self.instruments.len()
    }

    /// The active configuration.
    pub fn config(&self) -> &PortfolioConfig {
        &self.config
    }

    /// Attaches (or replaces) the Monte Carlo model. All per-instrument
    /// state is dropped; under [`WeightMode::Constant`] the shared
    /// time-zero Jacobian is computed here.
    pub fn attach_model(&mut self, engine: &'m dyn RatesEngine) -> Result<(), SensitivityError> {
        for instrument in &mut self.instruments {
            instrument.reset();
        }
        self.constant_weights = match self.config.weight_mode {
            WeightMode::Constant => {
                let projector =
                    build_projector(engine, 0.0, None, self.config.regression_order)?;
                Some(forward_swap_jacobian(engine, &projector, 0.0)?)
            }
            WeightMode::Stochastic => None,
        };
        self.engine = Some(engine);
        Ok(())
    }

    /// The delta sensitivity of one product on one maturity bucket. Zero
    /// for combinations the product has no exposure to.
    pub fn delta_sensitivity(
        &mut self,
        product_index: usize,
        risk_class: RiskClass,
        curve: CurveKey,
        bucket: usize,
        time: f64,
    ) -> Result<PathValue, SensitivityError> {
        let count = bucket_count(risk_class);
        if bucket >= count {
            return Err(SensitivityError::BucketOutOfRange {
                index: bucket,
                count,
            });
        }
        let values = self.bucket_values(product_index, risk_class, curve, time)?;
        Ok(values[bucket].clone())
    }

    /// The delta sensitivities of one product on all maturity buckets of a
    /// risk class.
    pub fn bucket_sensitivities(
        &mut self,
        product_index: usize,
        risk_class: RiskClass,
        curve: CurveKey,
        time: f64,
    ) -> Result<SensitivityVector, SensitivityError> {
        let values = self.bucket_values(product_index, risk_class, curve, time)?;
        Ok(SensitivityVector::new(values))
    }

    fn bucket_values(
        &mut self,
        product_index: usize,
        risk_class: RiskClass,
        curve: CurveKey,
        time: f64,
    ) -> Result<Vec<PathValue>, SensitivityError> {
        let engine = self.engine.ok_or(SensitivityError::ModelUnavailable)?;
        if product_index >= self.instruments.len() {
            return Err(SensitivityError::ProductOutOfRange {
                index: product_index,
                count: self.instruments.len(),
            });
        }
        let config = self.config;
        let weights = self.constant_weights.as_ref();
        let instrument = &mut self.instruments[product_index];

        if !instrument.product.risk_classes().contains(&risk_class)
            || !instrument.product.curves().contains(&curve)
        {
            return Ok(vec![PathValue::zero(); bucket_count(risk_class)]);
        }

        let day = day_offset(time);
        instrument.cache.ensure_not_stale(day)?;
        instrument.roll_memo_to(day);
        if let Some(memoised) = instrument.bucketed.get(&(risk_class, curve)) {
            return Ok(memoised.clone());
        }

        let values = match config.sensitivity_mode {
            SensitivityMode::Exact => {
                exact_bucket_sensitivities(instrument, engine, weights, &config, risk_class, curve, time)?
            }
            SensitivityMode::MeltingOnBuckets | SensitivityMode::MeltingOnGrid => {
                melted_bucket_sensitivities(instrument, engine, weights, &config, risk_class, curve, time)?
            }
            SensitivityMode::Interpolation => {
                let terminal = instrument
                    .product
                    .terminal_interpolation_time(engine)?
                    .unwrap_or(f64::INFINITY);
                if time >= terminal {
                    debug!(time, terminal, "interpolation window closed, melting instead");
                    melted_bucket_sensitivities(
                        instrument, engine, weights, &config, risk_class, curve, time,
                    )?
                } else {
                    interpolated_bucket_sensitivities(
                        instrument, engine, weights, &config, risk_class, curve, time, terminal,
                    )?
                }
            }
        };

        instrument
            .bucketed
            .insert((risk_class, curve), values.clone());
        instrument.last_evaluation_time = Some(time);
        Ok(values)
    }
}

/// The lifecycle-phase gradient, computed lazily and swapped exactly once
/// when the boundary is crossed.
fn gradient_for<'a>(
    instrument: &'a mut InstrumentState,
    engine: &dyn RatesEngine,
    post_boundary: bool,
) -> Result<&'a RiskFactorGradient, SensitivityError> {
    if instrument.gradient.is_none() || instrument.gradient_post_boundary != post_boundary {
        instrument.gradient = Some(instrument.product.gradient(engine, post_boundary)?);
        instrument.gradient_post_boundary = post_boundary;
    }
    Ok(instrument.gradient.as_ref().expect("gradient just set"))
}

/// Native-grid dV/dS for one curve at one time.
fn native_swap_sensitivities(
    instrument: &mut InstrumentState,
    engine: &dyn RatesEngine,
    constant_weights: Option<&PathMatrix>,
    config: &PortfolioConfig,
    curve: CurveKey,
    time: f64,
) -> Result<Vec<PathValue>, SensitivityError> {
    let projector: ConditionalExpectation = build_projector(
        engine,
        time,
        Some(&instrument.product),
        config.regression_order,
    )?;
    let post_boundary = instrument.cache.phase() == LifecyclePhase::PostBoundary
        || instrument.product.boundary().is_some_and(|b| time >= b.time);
    let gradient = gradient_for(instrument, engine, post_boundary)?;

    if curve.is_discount() {
        return discount_curve_sensitivities(gradient, engine, &projector, time);
    }
    let dvdl = value_forward_rate_sensitivities(gradient, engine, &projector, time)?;
    let dlds_stochastic;
    let dlds = match config.weight_mode {
        WeightMode::Constant => {
            constant_weights.ok_or(SensitivityError::ModelUnavailable)?
        }
        WeightMode::Stochastic => {
            dlds_stochastic = forward_swap_jacobian(engine, &projector, time)?;
            &dlds_stochastic
        }
    };
    Ok(swap_rate_sensitivities(&dvdl, dlds))
}

/// Relative day offsets of the native axis: entry `i` matures one tenor
/// period times `i + 1` past the evaluation time.
fn native_relative_days(engine: &dyn RatesEngine, len: usize) -> Vec<i64> {
    let step = engine.tenor_grid().first_step();
    (0..len).map(|i| day_offset((i + 1) as f64 * step)).collect()
}

fn exact_bucket_sensitivities(
    instrument: &mut InstrumentState,
    engine: &dyn RatesEngine,
    constant_weights: Option<&PathMatrix>,
    config: &PortfolioConfig,
    risk_class: RiskClass,
    curve: CurveKey,
    time: f64,
) -> Result<Vec<PathValue>, SensitivityError> {
    let native =
        native_swap_sensitivities(instrument, engine, constant_weights, config, curve, time)?;
    let days = native_relative_days(engine, native.len());
    Ok(sensitivities_on_buckets(&native, risk_class, &days))
}

/// Computes and caches the exact snapshot at `anchor_time` if absent.
fn ensure_exact_snapshot(
    instrument: &mut InstrumentState,
    engine: &dyn RatesEngine,
    constant_weights: Option<&PathMatrix>,
    config: &PortfolioConfig,
    risk_class: RiskClass,
    curve: CurveKey,
    anchor_time: f64,
    bucketed: bool,
) -> Result<SnapshotKey, SensitivityError> {
    let key = SnapshotKey {
        day: day_offset(anchor_time),
        risk_class,
        curve,
    };
    if !instrument.cache.contains(&key) {
        debug!(anchor_time, curve = %curve, "computing exact sensitivity anchor");
        let native = native_swap_sensitivities(
            instrument,
            engine,
            constant_weights,
            config,
            curve,
            anchor_time,
        )?;
        let values = if bucketed {
            let days = native_relative_days(engine, native.len());
            sensitivities_on_buckets(&native, risk_class, &days)
        } else {
            native
        };
        instrument.cache.insert(
            key,
            SensitivitySnapshot {
                values,
                kind: SnapshotKind::Exact,
            },
        );
    }
    Ok(key)
}

/// Resolves the initial melting time for `time`, clearing or rebuilding
/// the cache as the product's lifecycle requires.
fn resolve_melting_anchor(
    instrument: &mut InstrumentState,
    engine: &dyn RatesEngine,
    config: &PortfolioConfig,
    risk_class: RiskClass,
    time: f64,
) -> Result<f64, SensitivityError> {
    let step = config.reset_step_years;
    let reset_anchor = (time / step).floor() * step;
    let on_anchor = (time - reset_anchor).abs() < ANCHOR_EPS;
    let fresh_arrival = instrument.last_evaluation_time != Some(time);

    if instrument.product.exercise_times().is_some() {
        // Bermudan: path-wise exercise drives the anchors.
        let path_exercise = instrument
            .product
            .path_exercise_time(engine)?
            .expect("bermudan products report path exercise times");
        let first_exercise = path_exercise.min();
        if time < first_exercise {
            if on_anchor && fresh_arrival {
                instrument.cache.clear();
            }
            return Ok(reset_anchor);
        }
        return bermudan_reaccumulate(instrument, engine, config, risk_class, &path_exercise, time);
    }

    match instrument.product.boundary() {
        Some(boundary) if boundary.pins_melting_time && time >= boundary.time => {
            // Physical exercise / forward start: melting re-anchors at the
            // boundary, the cache is rebuilt exactly once.
            instrument.cache.cross_boundary(day_offset(boundary.time));
            Ok(boundary.time)
        }
        Some(boundary) => {
            if time >= boundary.time {
                // Cash settlement: melting keeps its reset anchors but the
                // post-boundary gradient takes over.
                instrument.cache.cross_boundary(day_offset(boundary.time));
            } else if on_anchor && fresh_arrival {
                instrument.cache.clear();
            }
            Ok(reset_anchor)
        }
        None => {
            if on_anchor && fresh_arrival {
                instrument.cache.clear();
            }
            Ok(reset_anchor)
        }
    }
}

/// Rebuilds the Bermudan snapshot at the last crossed exercise date: the
/// previous anchor's sensitivities melted forward plus the analytic leg
/// sensitivities of the newly exercised schedule, masked to the paths that
/// exercised in the window between the two dates.
fn bermudan_reaccumulate(
    instrument: &mut InstrumentState,
    engine: &dyn RatesEngine,
    config: &PortfolioConfig,
    risk_class: RiskClass,
    path_exercise: &PathValue,
    time: f64,
) -> Result<f64, SensitivityError> {
    let exercise_times: Vec<f64> = instrument
        .product
        .exercise_times()
        .expect("checked by caller")
        .to_vec();
    let last_index = exercise_times
        .partition_point(|&t| t <= time)
        .saturating_sub(1);
    let anchor_time = exercise_times[last_index];
    let anchor_day = day_offset(anchor_time);
    if instrument.bermudan_anchor_day == Some(anchor_day) {
        return Ok(anchor_time);
    }

    let forward_curve = instrument
        .product
        .curves()
        .into_iter()
        .find(|c| !c.is_discount())
        .expect("bermudan products carry a forward curve");
    let underlying = instrument
        .product
        .underlying_swap()
        .expect("bermudan products expose their underlying swap")
        .clone();
    let on_buckets = config.sensitivity_mode != SensitivityMode::MeltingOnGrid;

    // Leg sensitivities of the delivered schedule on the native grid.
    let gradient = underlying.gradient(engine, true)?;
    let leg: Vec<PathValue> = (0..engine.num_forward_rates())
        .map(|grid_index| gradient.derivative(&RiskFactorKey::Forward { grid_index }))
        .collect();

    // Every crossed exercise date is rebuilt in order, so skipping
    // evaluation dates never leaves a hole in the snapshot chain.
    let first_unbuilt = instrument
        .bermudan_anchor_day
        .map(|built| exercise_times.partition_point(|&t| day_offset(t) <= built))
        .unwrap_or(0);
    for index in first_unbuilt..=last_index {
        let exercise = exercise_times[index];
        debug!(exercise, "rebuilding bermudan sensitivities at exercise date");

        // Mask to paths that exercised in (previous date, this date].
        let mut masked = leg.clone();
        for entry in &mut masked {
            let not_yet = path_exercise - (exercise + EXERCISE_EPS);
            *entry = not_yet.choose(&PathValue::zero(), entry);
            if index > 0 {
                let after_previous =
                    path_exercise - (exercise_times[index - 1] + EXERCISE_EPS);
                *entry = after_previous.choose(entry, &PathValue::zero());
            }
        }
        // Re-index against the exercise date: periods already matured at
        // the exercise date fall away, the rest shift to relative tenors.
        let offset = engine.tenor_grid().index_le(exercise).unwrap_or(0);
        let relative = masked[offset.min(masked.len())..].to_vec();
        let new_values = if on_buckets {
            let days = native_relative_days(engine, relative.len());
            sensitivities_on_buckets(&relative, risk_class, &days)
        } else {
            relative
        };

        let accumulated = if index == 0 {
            instrument.cache.cross_boundary(day_offset(exercise));
            new_values
        } else {
            let previous_time = exercise_times[index - 1];
            let previous = instrument
                .cache
                .get(&SnapshotKey {
                    day: day_offset(previous_time),
                    risk_class,
                    curve: forward_curve,
                })
                .expect("previous exercise snapshot built above")
                .values
                .clone();
            let melted_previous = if on_buckets {
                melted_on_buckets(previous_time, exercise, &previous, risk_class)
            } else {
                melt_native(previous_time, exercise, &previous, engine.tenor_grid())
            };
            let len = melted_previous.len().max(new_values.len());
            (0..len)
                .map(|i| {
                    let zero = PathValue::zero();
                    let a = melted_previous.get(i).unwrap_or(&zero);
                    let b = new_values.get(i).unwrap_or(&zero);
                    a + b
                })
                .collect()
        };

        instrument.cache.insert(
            SnapshotKey {
                day: day_offset(exercise),
                risk_class,
                curve: forward_curve,
            },
            SensitivitySnapshot {
                values: accumulated,
                kind: SnapshotKind::Derived,
            },
        );
    }
    instrument.bermudan_anchor_day = Some(anchor_day);
    Ok(anchor_time)
}

fn melted_bucket_sensitivities(
    instrument: &mut InstrumentState,
    engine: &dyn RatesEngine,
    constant_weights: Option<&PathMatrix>,
    config: &PortfolioConfig,
    risk_class: RiskClass,
    curve: CurveKey,
    time: f64,
) -> Result<Vec<PathValue>, SensitivityError> {
    let initial_time =
        resolve_melting_anchor(instrument, engine, config, risk_class, time)?;
    let on_buckets = config.sensitivity_mode != SensitivityMode::MeltingOnGrid;
    let key = ensure_exact_snapshot(
        instrument,
        engine,
        constant_weights,
        config,
        risk_class,
        curve,
        initial_time,
        on_buckets,
    )?;
    let anchor_values = instrument
        .cache
        .get(&key)
        .expect("snapshot ensured above")
        .values
        .clone();

    let mut melted = if on_buckets {
        melted_on_buckets(initial_time, time, &anchor_values, risk_class)
    } else {
        melted_on_grid(
            initial_time,
            time,
            &anchor_values,
            engine.tenor_grid(),
            risk_class,
        )
    };

    if instrument.product.is_cancelable() && time > initial_time {
        let survival = survival_probability(instrument, engine, config, time)?;
        for value in &mut melted {
            *value = &*value * survival;
        }
    }
    Ok(melted)
}

#[allow(clippy::too_many_arguments)]
fn interpolated_bucket_sensitivities(
    instrument: &mut InstrumentState,
    engine: &dyn RatesEngine,
    constant_weights: Option<&PathMatrix>,
    config: &PortfolioConfig,
    risk_class: RiskClass,
    curve: CurveKey,
    time: f64,
    terminal: f64,
) -> Result<Vec<PathValue>, SensitivityError> {
    let step = config.reset_step_years;
    let initial_time = (time / step).floor() * step;
    let final_time = (initial_time + step).min(terminal);

    // Anchor snapshots are set for every curve of the instrument so that
    // later curve queries at the same times hit the cache.
    let mut initial_key = None;
    let mut final_key = None;
    for product_curve in instrument.product.curves() {
        let key_0 = ensure_exact_snapshot(
            instrument,
            engine,
            constant_weights,
            config,
            risk_class,
            product_curve,
            initial_time,
            true,
        )?;
        let key_1 = ensure_exact_snapshot(
            instrument,
            engine,
            constant_weights,
            config,
            risk_class,
            product_curve,
            final_time,
            true,
        )?;
        if product_curve == curve {
            initial_key = Some(key_0);
            final_key = Some(key_1);
        }
    }
    let initial_key = initial_key.expect("curve materiality checked by caller");
    let final_key = final_key.expect("curve materiality checked by caller");

    let initial = &instrument.cache.get(&initial_key).expect("ensured").values;
    if final_time <= initial_time {
        return Ok(initial.clone());
    }
    let final_values = &instrument.cache.get(&final_key).expect("ensured").values;
    let weight = (time - initial_time) / (final_time - initial_time);
    Ok(initial
        .iter()
        .zip(final_values)
        .map(|(s0, s1)| s0.add_product(&(s1 - s0), &PathValue::constant(weight)))
        .collect())
}

/// The estimated survival probability of a cancelable product at `time`:
/// the cross-path average of the chained positive-value indicator.
fn survival_probability(
    instrument: &mut InstrumentState,
    engine: &dyn RatesEngine,
    config: &PortfolioConfig,
    time: f64,
) -> Result<f64, SensitivityError> {
    let day = day_offset(time);
    if !instrument.life_indicators.contains_key(&day) {
        let projector = build_projector(
            engine,
            time,
            Some(&instrument.product),
            config.regression_order,
        )?;
        let value = instrument.product.value(time, engine)?;
        let projected = projector.project(&value);
        let previous = instrument
            .last_evaluation_time
            .map(day_offset)
            .and_then(|d| instrument.life_indicators.get(&d))
            .cloned()
            .unwrap_or_else(|| PathValue::constant(1.0));
        // Alive where the time-t expected value is positive and the path
        // was alive at the previous evaluation.
        let measurable = &projected * &previous;
        let alive = (-&measurable).choose(&PathValue::zero(), &PathValue::constant(1.0));
        instrument.life_indicators.insert(day, alive);
    }
    Ok(instrument.life_indicators[&day].average())
}
