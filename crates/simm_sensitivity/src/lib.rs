//! # Simm Sensitivity (L3: Dynamic SIMM Delta Sensitivities)
//!
//! Computes ISDA SIMM delta sensitivities for interest-rate portfolios
//! valued under a path-wise Monte Carlo model, at arbitrary future
//! evaluation times.
//!
//! The pipeline:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     simm_sensitivity (L3)                     │
//! ├───────────────────────────────────────────────────────────────┤
//! │  transform  - dV/dL, dL/dS, discount chain     → dV/dS        │
//! │  buckets    - native grid → SIMM maturity buckets             │
//! │  melting    - decay / interpolation between exact anchors     │
//! │  projector  - conditional-expectation regression at time t    │
//! │  linalg     - path-wise matrices, per-path SVD pseudo-inverse │
//! │  cache      - per-instrument snapshots, lifecycle boundaries  │
//! │  portfolio  - the facade: delta_sensitivity / buckets         │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entry point is [`SimmPortfolio`]; everything below it is exposed so the
//! individual stages can be driven and tested in isolation.

#![deny(rustdoc::broken_intra_doc_links)]

pub mod buckets;
pub mod cache;
pub mod linalg;
pub mod melting;
pub mod portfolio;
pub mod projector;
pub mod transform;

mod error;
mod instrument;

pub use buckets::{bucket_count, bucket_days, bucket_labels, sensitivities_on_buckets, SensitivityVector};
pub use cache::{LifecyclePhase, SensitivityCache, SensitivitySnapshot, SnapshotKey, SnapshotKind};
pub use error::SensitivityError;
pub use linalg::{multiply_vec, PathMatrix};
pub use portfolio::{PortfolioConfig, SensitivityMode, SimmPortfolio, WeightMode};
pub use projector::build_projector;
