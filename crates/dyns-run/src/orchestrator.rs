//! The three-phase dynamic nested sampling procedure.
//!
//! An exploratory run with `ninit` live points is checkpointed as it goes,
//! its importance curve is turned into a live-point schedule, and a dynamic
//! run follows the schedule, resuming from the latest exploratory checkpoint
//! before the importance peak when there is one.

use std::time::Instant;

use dyns_alloc::{allocate, SavitzkyGolay, Smoother};
use dyns_core::errors::ErrorInfo;
use dyns_core::{DynError, RunPaths, RunRecord, Sampler, SamplerSettings};
use tracing::{debug, info};

use crate::checkpoint::{copy_durably, remove_if_present, CheckpointRegistry};
use crate::config::DynamicOptions;
use crate::dyn_info::{settings_hash, DynInfo};
use crate::reader::{read_full_run, read_stats};

/// Runs dynamic nested sampling with the default Savitzky-Golay smoothing.
///
/// Output files land under `base.base_dir`: the exploratory run under
/// `<file_root>_init`, the dynamic run under `<file_root>_dyn` and the
/// allocation metadata in `<file_root>_dyn_info`.
pub fn run_dynamic_ns<S>(
    sampler: &mut S,
    base: &SamplerSettings,
    goal: f64,
    options: &DynamicOptions,
) -> Result<DynInfo, DynError>
where
    S: Sampler + ?Sized,
{
    let smoother = SavitzkyGolay::for_ninit(options.ninit)?;
    run_dynamic_ns_with_smoother(sampler, base, goal, options, &smoother)
}

/// Runs dynamic nested sampling with options supplied as a key/value map.
///
/// Unrecognised keys are rejected before the sampler is touched.
pub fn run_dynamic_ns_from_map<S>(
    sampler: &mut S,
    base: &SamplerSettings,
    goal: f64,
    options: serde_json::Map<String, serde_json::Value>,
) -> Result<DynInfo, DynError>
where
    S: Sampler + ?Sized,
{
    let options = DynamicOptions::from_map(options)?;
    run_dynamic_ns(sampler, base, goal, &options)
}

/// Runs dynamic nested sampling with a caller-supplied smoothing filter.
pub fn run_dynamic_ns_with_smoother<S>(
    sampler: &mut S,
    base: &SamplerSettings,
    goal: f64,
    options: &DynamicOptions,
    smoother: &dyn Smoother,
) -> Result<DynInfo, DynError>
where
    S: Sampler + ?Sized,
{
    let started = Instant::now();
    validate(base, goal, options)?;
    let init_paths = RunPaths::new(&base.base_dir, &format!("{}_init", base.file_root));
    let dyn_paths = RunPaths::new(&base.base_dir, &format!("{}_dyn", base.file_root));

    info!(file_root = %base.file_root, goal, ninit = options.ninit, "starting exploratory run");
    let exploration = explore(sampler, base, goal, options, &init_paths)?;

    let init_run = read_full_run(init_paths.file_root(), &base.base_dir)?;
    let target_samples = sample_target(base, options, &init_run)?;
    let allocation = allocate(&init_run, target_samples, goal, smoother)?;
    info!(
        peak_start_ind = allocation.peak_start_ind,
        target_samples,
        max_nlive = allocation.nlives.max_nlive(),
        "allocated live points"
    );

    let checkpoint = if allocation.peak_start_ind == 0 {
        None
    } else {
        exploration.registry.latest_before(allocation.peak_start_ind).cloned()
    };
    if let Some(entry) = &checkpoint {
        debug!(ndead = entry.ndead, path = %entry.path.display(), "staging resume file");
        copy_durably(&entry.path, &dyn_paths.resume())?;
    }
    let removed = exploration.registry.remove_files()?;
    debug!(removed, "removed exploratory checkpoints");

    let seed = next_seed(exploration.last_seed, options.seed_increment);
    let nlive = if goal == 0.0 {
        allocation.nlives.max_nlive().unwrap_or(options.ninit)
    } else {
        options.ninit
    };
    let dyn_settings = base
        .clone()
        .with_file_root(dyn_paths.file_root())
        .with_nlive(nlive)
        .with_schedule(allocation.nlives.clone())
        .with_seed(seed)
        .with_max_ndead(-1)
        .with_resume(base.write_resume, checkpoint.is_some());
    info!(
        nlive,
        seed,
        resume_ndead = checkpoint.as_ref().map(|entry| entry.ndead),
        "starting dynamic run"
    );
    sampler.run(&dyn_settings)?;

    let info = DynInfo {
        goal,
        ninit: options.ninit,
        target_samples,
        allocation,
        resume_ndead: checkpoint.as_ref().map(|entry| entry.ndead),
        resume_nlike: checkpoint.as_ref().map(|entry| entry.stats.nlike),
        settings_hash: settings_hash(base)?,
    };
    let info_path = RunPaths::new(&base.base_dir, &base.file_root).dyn_info();
    info.write(&info_path)?;
    remove_if_present(&init_paths.resume())?;
    remove_if_present(&dyn_paths.resume())?;

    if options.print_time {
        info!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            file_root = %base.file_root,
            "dynamic nested sampling finished"
        );
    }
    Ok(info)
}

struct Exploration {
    registry: CheckpointRegistry,
    last_seed: i64,
}

fn validate(base: &SamplerSettings, goal: f64, options: &DynamicOptions) -> Result<(), DynError> {
    dyns_alloc::importance::check_goal(goal)?;
    if !base.nlives.is_empty() {
        return Err(DynError::Usage(
            ErrorInfo::new("schedule-preset", "base settings already carry a live-point schedule")
                .with_hint("the schedule is computed by the dynamic procedure"),
        ));
    }
    if base.read_resume {
        return Err(DynError::Usage(
            ErrorInfo::new("read-resume-preset", "base settings must not request read_resume")
                .with_hint("resuming is managed by the dynamic procedure"),
        ));
    }
    if options.ninit == 0 || options.init_step() == 0 {
        return Err(DynError::Usage(
            ErrorInfo::new("zero-step", "ninit and init_step must be positive")
                .with_context("ninit", options.ninit.to_string())
                .with_context("init_step", options.init_step().to_string()),
        ));
    }
    let nlive_const = options.nlive_const(base.nlive);
    if base.ndead_cap().is_none() && nlive_const <= options.ninit {
        return Err(DynError::Precondition(
            ErrorInfo::new(
                "nlive-const-too-small",
                "nlive_const must exceed ninit when max_ndead is not set",
            )
            .with_context("nlive_const", nlive_const.to_string())
            .with_context("ninit", options.ninit.to_string()),
        ));
    }
    Ok(())
}

fn next_seed(seed: i64, increment: i64) -> i64 {
    if seed >= 0 {
        seed + increment
    } else {
        seed
    }
}

/// Phase A: the exploratory run, checkpointed every `init_step` dead points
/// unless the goal is pure evidence, in which case it runs once with the base
/// seed.
fn explore<S>(
    sampler: &mut S,
    base: &SamplerSettings,
    goal: f64,
    options: &DynamicOptions,
    paths: &RunPaths,
) -> Result<Exploration, DynError>
where
    S: Sampler + ?Sized,
{
    let settings = base
        .clone()
        .with_file_root(paths.file_root())
        .with_nlive(options.ninit)
        .with_max_ndead(-1);
    let mut registry = CheckpointRegistry::new(paths.clone());
    let mut seed = base.seed;

    if goal == 0.0 {
        sampler.run(&settings)?;
        return Ok(Exploration {
            registry,
            last_seed: seed,
        });
    }

    let init_step = options.init_step();
    let mut previous: Option<usize> = None;
    let mut step = 0usize;
    loop {
        if options.max_init_steps.is_some_and(|max| step >= max) {
            return Err(DynError::Precondition(
                ErrorInfo::new(
                    "init-steps-exhausted",
                    "exploratory run did not terminate within max_init_steps increments",
                )
                .with_context("max_init_steps", step.to_string()),
            ));
        }
        seed = next_seed(seed, options.seed_increment);
        let increment = settings
            .clone()
            .with_max_ndead(((step + 1) * init_step) as i64)
            .with_resume(true, step > 0)
            .with_seed(seed);
        sampler.run(&increment)?;
        let stats = read_stats(paths.file_root(), paths.base_dir())?;
        let step_ndead = stats.ndead.saturating_sub(options.ninit);
        info!(step, step_ndead, nlike = stats.nlike, "exploratory increment finished");
        if previous == Some(step_ndead) {
            break;
        }
        registry.record(step_ndead, stats)?;
        previous = Some(step_ndead);
        step += 1;
    }
    Ok(Exploration {
        registry,
        last_seed: seed,
    })
}

/// Total sample budget: the explicit dead-point cap when set, otherwise the
/// sample count of a constant `nlive_const` run with the same shape.
fn sample_target(
    base: &SamplerSettings,
    options: &DynamicOptions,
    init_run: &RunRecord,
) -> Result<f64, DynError> {
    let ndead = init_run.ndead();
    match base.ndead_cap() {
        Some(cap) if cap <= ndead => Err(DynError::Precondition(
            ErrorInfo::new(
                "max-ndead-exhausted",
                "max_ndead is not larger than the exploratory run",
            )
            .with_context("max_ndead", cap.to_string())
            .with_context("init_ndead", ndead.to_string())
            .with_hint("raise max_ndead or lower ninit"),
        )),
        Some(cap) => Ok(cap as f64),
        None => Ok(ndead as f64 * options.nlive_const(base.nlive) as f64 / options.ninit as f64),
    }
}
