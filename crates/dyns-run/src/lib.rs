#![deny(missing_docs)]

//! Dynamic nested sampling on top of any [`dyns_core::Sampler`].
//!
//! [`run_dynamic_ns`] drives an exploratory run, allocates live points from
//! it and launches the dynamic run. [`process_dynamic_run`] loads both runs
//! back and merges them for analysis.

/// Checkpoint registry for exploratory resume files.
pub mod checkpoint;
pub mod combine;
/// Options accepted by the dynamic procedure.
pub mod config;
/// Metadata persisted next to a dynamic run.
pub mod dyn_info;
pub mod estimators;
pub mod orchestrator;
/// Loading and merging of finished procedures.
pub mod output;
pub mod reader;

pub use checkpoint::{remove_if_present, CheckpointEntry, CheckpointRegistry};
pub use combine::{combine_independent_runs, combine_resumed_run};
pub use config::DynamicOptions;
pub use dyn_info::DynInfo;
pub use orchestrator::{run_dynamic_ns, run_dynamic_ns_from_map, run_dynamic_ns_with_smoother};
pub use output::{process_dynamic_run, settings_root, ProcessedRun, RootOptions};
pub use reader::{read_full_run, read_stats};
