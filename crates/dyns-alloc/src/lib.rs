#![deny(missing_docs)]

//! Live-point allocation for dynamic nested sampling.
//!
//! An exploratory run with a constant number of live points is turned into
//! an importance curve for the chosen goal (evidence, parameter estimation or
//! a mix), smoothed, and scaled into a live-point schedule for a second run.

/// Allocation of live points from an importance curve.
pub mod allocate;
pub mod importance;
/// Smoothing filters for raw importance curves.
pub mod smoothing;

pub use allocate::{allocate, expected_samples, logx_widths, Allocation};
pub use importance::{evidence_importance, param_importance, sample_importance};
pub use smoothing::{NoSmoothing, SavitzkyGolay, Smoother};
