#![deny(missing_docs)]
#![doc = "Core run records, sampler settings and error types shared by the dyns crates."]

pub mod errors;
pub mod rng;
pub mod run;
/// Sampler settings, live-point schedules and output file layout.
pub mod settings;

pub use errors::{DynError, ErrorInfo};
pub use rng::{derive_substream_seed, RngHandle};
pub use run::{log_sum_exp, DeadPoint, RunRecord, RunStats, ThreadBounds, ThreadLabel};
pub use settings::{NliveSchedule, RunPaths, SamplerSettings, ScheduleEntry};

/// A nested sampling backend driven by the orchestrator.
///
/// Implementations run to completion (or to `settings.max_ndead`) and express
/// every result as files under `settings.paths()`.
pub trait Sampler {
    /// Executes one sampler invocation.
    fn run(&mut self, settings: &SamplerSettings) -> Result<(), DynError>;
}

impl<F> Sampler for F
where
    F: FnMut(&SamplerSettings) -> Result<(), DynError>,
{
    fn run(&mut self, settings: &SamplerSettings) -> Result<(), DynError> {
        self(settings)
    }
}
