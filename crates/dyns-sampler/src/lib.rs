#![deny(missing_docs)]

//! Reference sampler adapter for dynamic nested sampling.
//!
//! [`NestedSampler`] implements [`dyns_core::Sampler`]: it honours constant
//! live-point counts and schedules, dead-point caps, resume files and
//! deterministic seeds, and writes the dead-birth and stats files the run
//! reader consumes.

pub mod likelihoods;
/// Constrained random-walk nested sampler.
pub mod nested;
pub mod priors;
/// Resume state and output file writers.
pub mod state;

pub use likelihoods::Likelihood;
pub use nested::NestedSampler;
pub use priors::Prior;
pub use state::{SamplerState, LOG_ZERO};
