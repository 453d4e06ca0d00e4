//! Per-instrument sensitivity snapshots and the lifecycle state machine.
//!
//! Snapshots are keyed by canonical act/365 day offsets, never by raw
//! `f64` times. The cache is cleared whole, never partially; the clearing
//! that accompanies a lifecycle boundary fires exactly once, after which
//! evaluation times behind the boundary are rejected.

use std::collections::HashMap;

use tracing::debug;

use simm_core::{CurveKey, PathValue, RiskClass};

use crate::error::SensitivityError;

/// Composite key of a cached sensitivity snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    /// Canonical act/365 day offset of the snapshot time.
    pub day: i64,
    /// SIMM risk class.
    pub risk_class: RiskClass,
    /// Curve the sensitivities are against.
    pub curve: CurveKey,
}

/// How a snapshot was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotKind {
    /// Full recomputation through the transformation pipeline. Only these
    /// anchor melting and interpolation.
    Exact,
    /// Derived from exact snapshots (melted, interpolated, accumulated).
    Derived,
}

/// A stored sensitivity vector with its provenance.
#[derive(Clone, Debug)]
pub struct SensitivitySnapshot {
    /// Per-node sensitivities (native grid or buckets, per the mode).
    pub values: Vec<PathValue>,
    /// Provenance of the values.
    pub kind: SnapshotKind,
}

/// Lifecycle phase of an instrument's cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Before the product's lifecycle boundary (or no boundary).
    PreBoundary,
    /// The boundary has been crossed; the cache was rebuilt.
    PostBoundary,
}

/// Snapshot cache of one instrument.
#[derive(Debug, Default)]
pub struct SensitivityCache {
    snapshots: HashMap<SnapshotKey, SensitivitySnapshot>,
    phase: Option<i64>,
}

impl SensitivityCache {
    /// An empty cache in the pre-boundary phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> LifecyclePhase {
        if self.phase.is_some() {
            LifecyclePhase::PostBoundary
        } else {
            LifecyclePhase::PreBoundary
        }
    }

    /// Day offset of the crossed boundary, if any.
    pub fn boundary_day(&self) -> Option<i64> {
        self.phase
    }

    /// Stores a snapshot.
    pub fn insert(&mut self, key: SnapshotKey, snapshot: SensitivitySnapshot) {
        self.snapshots.insert(key, snapshot);
    }

    /// Looks up a snapshot.
    pub fn get(&self, key: &SnapshotKey) -> Option<&SensitivitySnapshot> {
        self.snapshots.get(key)
    }

    /// Whether a snapshot exists.
    pub fn contains(&self, key: &SnapshotKey) -> bool {
        self.snapshots.contains_key(key)
    }

    /// Clears every snapshot (a re-anchoring, not a boundary crossing).
    pub fn clear(&mut self) {
        if !self.snapshots.is_empty() {
            debug!(snapshots = self.snapshots.len(), "clearing sensitivity cache");
        }
        self.snapshots.clear();
    }

    /// Transitions to the post-boundary phase, clearing the cache. The
    /// transition fires at most once; later calls are no-ops.
    pub fn cross_boundary(&mut self, boundary_day: i64) {
        if self.phase.is_none() {
            debug!(boundary_day, "crossing lifecycle boundary");
            self.clear();
            self.phase = Some(boundary_day);
        }
    }

    /// Rejects evaluation times behind a crossed boundary.
    pub fn ensure_not_stale(&self, requested_day: i64) -> Result<(), SensitivityError> {
        match self.phase {
            Some(boundary_day) if requested_day < boundary_day => {
                Err(SensitivityError::StaleCacheAccess {
                    requested_day,
                    boundary_day,
                })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(day: i64) -> SnapshotKey {
        SnapshotKey {
            day,
            risk_class: RiskClass::InterestRate,
            curve: CurveKey::FORWARD_6M,
        }
    }

    fn snapshot() -> SensitivitySnapshot {
        SensitivitySnapshot {
            values: vec![PathValue::constant(1.0)],
            kind: SnapshotKind::Exact,
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut cache = SensitivityCache::new();
        cache.insert(key(183), snapshot());
        assert!(cache.contains(&key(183)));
        assert!(!cache.contains(&key(365)));
    }

    #[test]
    fn test_boundary_transition_fires_once() {
        let mut cache = SensitivityCache::new();
        cache.insert(key(183), snapshot());
        assert_eq!(cache.phase(), LifecyclePhase::PreBoundary);

        cache.cross_boundary(365);
        assert_eq!(cache.phase(), LifecyclePhase::PostBoundary);
        assert!(!cache.contains(&key(183)));

        // A second crossing must not clear again or move the boundary.
        cache.insert(key(730), snapshot());
        cache.cross_boundary(1095);
        assert!(cache.contains(&key(730)));
        assert_eq!(cache.boundary_day(), Some(365));
    }

    #[test]
    fn test_stale_access_is_rejected() {
        let mut cache = SensitivityCache::new();
        cache.cross_boundary(365);
        assert!(cache.ensure_not_stale(365).is_ok());
        assert!(matches!(
            cache.ensure_not_stale(183),
            Err(SensitivityError::StaleCacheAccess {
                requested_day: 183,
                boundary_day: 365,
            })
        ));
    }
}
