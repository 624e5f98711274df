use std::path::Path;

use dyns_core::errors::ErrorInfo;
use dyns_core::{DynError, RunPaths, RunRecord, RunStats};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combine::{combine_independent_runs, combine_resumed_run};
use crate::dyn_info::DynInfo;
use crate::reader::read_full_run;

/// A finished dynamic procedure loaded back from disk.
#[derive(Debug, Clone)]
pub struct ProcessedRun {
    /// Exploratory and dynamic runs merged into one.
    pub run: RunRecord,
    /// Allocation metadata of the dynamic run.
    pub info: DynInfo,
    /// Likelihood evaluations across both runs, shared work counted once.
    pub nlike: u64,
}

/// Loads the exploratory and dynamic runs under `file_root` and merges them.
///
/// A dynamic run that resumed from an exploratory checkpoint is merged with
/// [`combine_resumed_run`]; otherwise the two runs are independent.
pub fn process_dynamic_run(
    file_root: &str,
    base_dir: &Path,
    goal: f64,
) -> Result<ProcessedRun, DynError> {
    let info_path = RunPaths::new(base_dir, file_root).dyn_info();
    let info = DynInfo::load(&info_path)?;
    if (info.goal - goal).abs() > f64::EPSILON {
        return Err(DynError::Usage(
            ErrorInfo::new("goal-mismatch", "run was allocated for a different goal")
                .with_context("requested", goal.to_string())
                .with_context("recorded", info.goal.to_string()),
        ));
    }
    let init = read_full_run(&format!("{file_root}_init"), base_dir)?;
    let dynamic = read_full_run(&format!("{file_root}_dyn"), base_dir)?;
    let mut run = match info.resume_ndead {
        Some(resume_ndead) => combine_resumed_run(&init, &dynamic, resume_ndead)?,
        None => combine_independent_runs(&[init.clone(), dynamic.clone()])?,
    };
    let nlike = (init.nlike() + dynamic.nlike()).saturating_sub(info.resume_nlike.unwrap_or(0));
    debug!(
        ndead = run.ndead(),
        nlike,
        resume_ndead = info.resume_ndead,
        "processed dynamic run"
    );
    run.set_stats(RunStats {
        ndead: run.ndead(),
        nlike,
        logz: None,
        logz_err: None,
    });
    Ok(ProcessedRun { run, info, nlike })
}

/// Parameters naming a problem configuration in [`settings_root`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootOptions {
    /// Scale of the prior.
    #[serde(default = "default_prior_scale")]
    pub prior_scale: f64,
    /// Dynamic goal, `None` for a constant live-point run.
    #[serde(default)]
    pub dynamic_goal: Option<f64>,
    /// Live points of the constant run the budget is matched to.
    #[serde(default = "default_nlive_const")]
    pub nlive_const: usize,
    /// Random-walk repeats per replacement point.
    #[serde(default = "default_nrepeats")]
    pub nrepeats: usize,
    /// Exploratory live points (dynamic runs only).
    #[serde(default)]
    pub ninit: Option<usize>,
    /// Exploratory checkpoint interval (dynamic runs only).
    #[serde(default)]
    pub init_step: Option<usize>,
}

fn default_prior_scale() -> f64 {
    10.0
}

fn default_nlive_const() -> usize {
    100
}

fn default_nrepeats() -> usize {
    20
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            prior_scale: default_prior_scale(),
            dynamic_goal: None,
            nlive_const: default_nlive_const(),
            nrepeats: default_nrepeats(),
            ninit: None,
            init_step: None,
        }
    }
}

/// Stable file root describing a likelihood, prior and run configuration.
pub fn settings_root(likelihood: &str, prior: &str, ndim: usize, options: &RootOptions) -> String {
    let mut root = format!(
        "{}_{}_{}_dg{}",
        likelihood.to_lowercase(),
        prior.to_lowercase(),
        options.prior_scale,
        options
            .dynamic_goal
            .map_or_else(|| "none".to_string(), |goal| goal.to_string())
    );
    if options.dynamic_goal.is_some() {
        let ninit = options.ninit.unwrap_or(10);
        root.push_str(&format!("_{ninit}init_{}is", options.init_step.unwrap_or(ninit)));
    }
    root.push_str(&format!(
        "_{ndim}d_{}nlive_{}nrepeats",
        options.nlive_const, options.nrepeats
    ));
    root.replace('.', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roots_distinguish_dynamic_and_constant_runs() {
        let constant = settings_root("Gaussian", "Gaussian", 2, &RootOptions::default());
        assert_eq!(constant, "gaussian_gaussian_10_dgnone_2d_100nlive_20nrepeats");
        let dynamic = settings_root(
            "Gaussian",
            "Uniform",
            3,
            &RootOptions {
                dynamic_goal: Some(0.25),
                ninit: Some(5),
                ..RootOptions::default()
            },
        );
        assert_eq!(dynamic, "gaussian_uniform_10_dg0_25_5init_5is_3d_100nlive_20nrepeats");
    }
}
