//! Pinned outputs of the full procedure driven by a scripted sampler.
//!
//! The scripted sampler writes fixed dead-birth files, so every number below
//! depends only on the reader, the allocation, the checkpoint selection, the
//! combination and the estimators.

use std::fs;

use approx::assert_relative_eq;
use dyns_core::{DynError, RunPaths, RunStats, Sampler, SamplerSettings};
use dyns_run::{estimators, process_dynamic_run, run_dynamic_ns, DynamicOptions};
use dyns_sampler::LOG_ZERO;
use serde_json::json;
use tempfile::tempdir;

const NINIT: usize = 2;
const NPOINTS: usize = 30;

fn log_likelihood(x: f64) -> f64 {
    let distance = NPOINTS as f64 - x;
    -(distance * distance) / 60.0
}

/// Stands in for a sampler: the exploratory run is a fixed two-thread run
/// truncated at `max_ndead`, the dynamic run keeps the first `k` exploratory
/// points of the staged checkpoint and adds three threads on a finer grid.
struct ScriptedSampler;

impl ScriptedSampler {
    fn exploratory_rows(count: usize) -> Vec<(f64, f64, f64)> {
        (0..count)
            .map(|j| {
                let birth = if j < NINIT {
                    LOG_ZERO
                } else {
                    log_likelihood((j - NINIT) as f64)
                };
                (j as f64 / 10.0 - 1.0, log_likelihood(j as f64), birth)
            })
            .collect()
    }

    fn dynamic_rows(shared: usize) -> Vec<(f64, f64, f64)> {
        let mut rows = Self::exploratory_rows(shared);
        let fresh: Vec<f64> = (0..)
            .map(|i| shared as f64 + 0.25 + 0.5 * i as f64)
            .take_while(|x| *x < NPOINTS as f64)
            .map(log_likelihood)
            .collect();
        for (i, logl) in fresh.iter().enumerate() {
            let birth = match (i, shared) {
                (0..=2, 0) => LOG_ZERO,
                (0..=2, _) => log_likelihood((shared - 1) as f64),
                _ => fresh[i - 3],
            };
            rows.push((0.5 - i as f64 / 40.0, *logl, birth));
        }
        rows
    }

    fn write(paths: &RunPaths, rows: &[(f64, f64, f64)], resume: Option<usize>) {
        let text: String = rows
            .iter()
            .map(|(theta, logl, birth)| format!("{theta:e} {logl:e} {birth:e}\n"))
            .collect();
        fs::write(paths.dead_birth(), text).unwrap();
        let stats = RunStats {
            ndead: rows.len(),
            nlike: 3 * rows.len() as u64,
            ..RunStats::default()
        };
        fs::write(paths.stats(), serde_json::to_string(&stats).unwrap()).unwrap();
        if let Some(shared) = resume {
            fs::write(paths.resume(), json!({ "shared": shared }).to_string()).unwrap();
        }
    }
}

impl Sampler for ScriptedSampler {
    fn run(&mut self, settings: &SamplerSettings) -> Result<(), DynError> {
        let paths = settings.paths();
        if settings.file_root.ends_with("_init") {
            let count = match usize::try_from(settings.max_ndead) {
                Ok(cap) => (cap + NINIT).min(NPOINTS),
                Err(_) => NPOINTS,
            };
            let resume = settings.write_resume.then_some(count - NINIT);
            Self::write(&paths, &Self::exploratory_rows(count), resume);
        } else {
            let shared = if settings.read_resume {
                let staged: serde_json::Value =
                    serde_json::from_str(&fs::read_to_string(paths.resume()).unwrap()).unwrap();
                staged["shared"].as_u64().unwrap() as usize
            } else {
                0
            };
            Self::write(&paths, &Self::dynamic_rows(shared), None);
        }
        Ok(())
    }
}

struct Expected {
    peak_start_ind: usize,
    max_nlive: usize,
    resume: Option<(usize, u64)>,
    nlike: u64,
    samples: usize,
    logz: f64,
    mean: f64,
}

fn check(goal: f64, expected: Expected) {
    let dir = tempdir().unwrap();
    let base = SamplerSettings {
        nlive: 10,
        base_dir: dir.path().to_path_buf(),
        ..SamplerSettings::default()
    }
    .with_file_root("golden");
    let options = DynamicOptions {
        ninit: NINIT,
        ..DynamicOptions::default()
    };
    let info = run_dynamic_ns(&mut ScriptedSampler, &base, goal, &options).unwrap();
    assert_eq!(info.target_samples, 150.0);
    assert_eq!(info.allocation.peak_start_ind, expected.peak_start_ind);
    assert_eq!(info.allocation.nlives.max_nlive(), Some(expected.max_nlive));
    assert_eq!(info.allocation.nlives.min_nlive(), Some(NINIT));
    assert_eq!(
        info.resume_ndead.zip(info.resume_nlike),
        expected.resume,
        "goal {goal}"
    );

    let processed = process_dynamic_run("golden", dir.path(), goal).unwrap();
    assert_eq!(processed.nlike, expected.nlike);
    assert_eq!(estimators::count_samples(&processed.run), expected.samples);
    assert_relative_eq!(
        estimators::logz(&processed.run),
        expected.logz,
        max_relative = 1e-9
    );
    assert_relative_eq!(
        estimators::param_mean(&processed.run, 0).unwrap(),
        expected.mean,
        max_relative = 1e-9
    );
}

#[test]
fn evidence_goal_outputs_are_pinned() {
    check(
        0.0,
        Expected {
            peak_start_ind: 0,
            max_nlive: 14,
            resume: None,
            nlike: 270,
            samples: 90,
            logz: -10.602243943317797,
            mean: 0.0068421306377855345,
        },
    );
}

#[test]
fn parameter_goal_outputs_are_pinned() {
    check(
        1.0,
        Expected {
            peak_start_ind: 15,
            max_nlive: 17,
            resume: Some((14, 48)),
            nlike: 180,
            samples: 62,
            logz: -9.641024809344534,
            mean: 0.25984250121739144,
        },
    );
}

#[test]
fn mixed_goal_outputs_are_pinned() {
    check(
        0.5,
        Expected {
            peak_start_ind: 13,
            max_nlive: 13,
            resume: Some((12, 42)),
            nlike: 192,
            samples: 66,
            logz: -9.70516020227274,
            mean: 0.2304587750570263,
        },
    );
}
