//! Merging of nested sampling runs into a single run.

use std::collections::BTreeMap;

use dyns_core::errors::ErrorInfo;
use dyns_core::{DeadPoint, DynError, RunRecord, RunStats, ThreadBounds, ThreadLabel};

/// Relative tolerance for matching likelihoods across runs.
pub const LOGL_TOLERANCE: f64 = 1e-9;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= LOGL_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

fn contains_close(sorted: &[f64], logl: f64) -> bool {
    let slack = LOGL_TOLERANCE * logl.abs().max(1.0);
    let start = sorted.partition_point(|&v| v < logl - slack);
    sorted.get(start).is_some_and(|&v| close(v, logl))
}

/// Merges a run with a second run that was resumed from it after
/// `resume_ndead` dead points.
///
/// The shared prefix is taken from `prefix`. Every point of `resumed` beyond
/// the boundary is kept with its own labels. Points of `prefix` beyond the
/// boundary that `resumed` did not produce again are kept on relabelled
/// threads, so the merged run carries both sets of live points where they
/// overlap. Live-point counts are recomputed from the merged thread bounds.
pub fn combine_resumed_run(
    prefix: &RunRecord,
    resumed: &RunRecord,
    resume_ndead: usize,
) -> Result<RunRecord, DynError> {
    if resume_ndead > prefix.ndead() || resume_ndead > resumed.ndead() {
        return Err(DynError::Consistency(
            ErrorInfo::new("resume-beyond-run", "resume point lies beyond the end of a run")
                .with_context("resume_ndead", resume_ndead.to_string())
                .with_context("prefix_ndead", prefix.ndead().to_string())
                .with_context("resumed_ndead", resumed.ndead().to_string()),
        ));
    }
    let shared = prefix.dead_points()[..resume_ndead]
        .iter()
        .zip(&resumed.dead_points()[..resume_ndead]);
    for (idx, (a, b)) in shared.enumerate() {
        if !close(a.log_likelihood, b.log_likelihood) {
            return Err(DynError::Consistency(
                ErrorInfo::new(
                    "resume-mismatch",
                    "runs disagree on the dead points before the resume point",
                )
                .with_context("index", idx.to_string())
                .with_context("prefix_logl", a.log_likelihood.to_string())
                .with_context("resumed_logl", b.log_likelihood.to_string())
                .with_hint("the resumed run must start from a checkpoint of the prefix run"),
            ));
        }
    }

    let mut bounds = resumed.thread_bounds().clone();
    let mut points: Vec<DeadPoint> = prefix.dead_points()[..resume_ndead].to_vec();
    for point in &points {
        if let Some(thread) = prefix.thread_bounds().get(&point.thread_label) {
            bounds.entry(point.thread_label).or_insert(*thread);
        }
    }
    points.extend(resumed.dead_points()[resume_ndead..].iter().cloned());

    let resumed_logl = resumed.log_likelihoods();
    let mut next_label = bounds.keys().next_back().map_or(0, |max| max + 1);
    let mut relabelled: BTreeMap<ThreadLabel, ThreadLabel> = BTreeMap::new();
    let mut previous: BTreeMap<ThreadLabel, f64> = BTreeMap::new();
    for (idx, point) in prefix.dead_points().iter().enumerate() {
        let label = point.thread_label;
        let logl = point.log_likelihood;
        if idx >= resume_ndead && !contains_close(&resumed_logl, logl) {
            let new_label = match relabelled.get(&label) {
                Some(existing) => *existing,
                None => {
                    let original = prefix
                        .thread_bounds()
                        .get(&label)
                        .copied()
                        .unwrap_or(ThreadBounds::new(f64::NEG_INFINITY, logl));
                    let start = previous.get(&label).copied().unwrap_or(original.min);
                    let assigned = next_label;
                    next_label += 1;
                    bounds.insert(assigned, ThreadBounds::new(start, original.max));
                    relabelled.insert(label, assigned);
                    assigned
                }
            };
            points.push(DeadPoint {
                thread_label: new_label,
                ..point.clone()
            });
        }
        previous.insert(label, logl);
    }

    let stats = RunStats {
        ndead: points.len(),
        nlike: prefix.nlike() + resumed.nlike(),
        logz: None,
        logz_err: None,
    };
    let run = RunRecord::from_threads(points, bounds, stats)?;
    run.check_invariants()?;
    Ok(run)
}

/// Merges independent runs, offsetting thread labels so they stay distinct.
pub fn combine_independent_runs(runs: &[RunRecord]) -> Result<RunRecord, DynError> {
    let mut points = Vec::new();
    let mut bounds = BTreeMap::new();
    let mut nlike = 0;
    let mut offset: ThreadLabel = 0;
    for run in runs {
        for (label, thread) in run.thread_bounds() {
            bounds.insert(label + offset, *thread);
        }
        points.extend(run.dead_points().iter().map(|point| DeadPoint {
            thread_label: point.thread_label + offset,
            ..point.clone()
        }));
        nlike += run.nlike();
        offset += run.max_thread_label().map_or(0, |max| max + 1);
    }
    let stats = RunStats {
        ndead: points.len(),
        nlike,
        logz: None,
        logz_err: None,
    };
    RunRecord::from_threads(points, bounds, stats)
}
