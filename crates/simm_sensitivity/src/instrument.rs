//! Per-instrument state: the product, its snapshot cache, its gradient and
//! the bookkeeping that drives melting anchors and survival damping.

use std::collections::HashMap;

use simm_core::{CurveKey, PathValue, RiskClass};
use simm_models::{RatesProduct, RiskFactorGradient};

use crate::cache::SensitivityCache;

/// One product of the portfolio together with its mutable pipeline state.
pub(crate) struct InstrumentState {
    pub(crate) product: RatesProduct,
    /// Exact and derived snapshots anchoring melting and interpolation.
    pub(crate) cache: SensitivityCache,
    /// Gradient of the current lifecycle phase, computed lazily.
    pub(crate) gradient: Option<RiskFactorGradient>,
    /// Whether the stored gradient is the post-boundary one.
    pub(crate) gradient_post_boundary: bool,
    /// Final bucketed results memoised for the current evaluation day.
    pub(crate) bucketed: HashMap<(RiskClass, CurveKey), Vec<PathValue>>,
    pub(crate) bucketed_day: Option<i64>,
    /// Last evaluation time seen, for anchor-arrival detection.
    pub(crate) last_evaluation_time: Option<f64>,
    /// Path-wise life indicators per evaluation day (survival damping).
    pub(crate) life_indicators: HashMap<i64, PathValue>,
    /// Day of the Bermudan exercise anchor the cache was last rebuilt at.
    pub(crate) bermudan_anchor_day: Option<i64>,
}

impl InstrumentState {
    pub(crate) fn new(product: RatesProduct) -> Self {
        Self {
            product,
            cache: SensitivityCache::new(),
            gradient: None,
            gradient_post_boundary: false,
            bucketed: HashMap::new(),
            bucketed_day: None,
            last_evaluation_time: None,
            life_indicators: HashMap::new(),
            bermudan_anchor_day: None,
        }
    }

    /// Drops all state derived from a previously attached model.
    pub(crate) fn reset(&mut self) {
        self.cache = SensitivityCache::new();
        self.gradient = None;
        self.gradient_post_boundary = false;
        self.bucketed.clear();
        self.bucketed_day = None;
        self.last_evaluation_time = None;
        self.life_indicators.clear();
        self.bermudan_anchor_day = None;
    }

    /// Invalidates the per-day result memo when the evaluation day moves.
    pub(crate) fn roll_memo_to(&mut self, day: i64) {
        if self.bucketed_day != Some(day) {
            self.bucketed.clear();
            self.bucketed_day = Some(day);
        }
    }
}
