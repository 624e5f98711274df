use dyns_core::errors::ErrorInfo;
use dyns_core::{DynError, NliveSchedule, RunRecord, ScheduleEntry};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::importance::{check_goal, sample_importance};
use crate::smoothing::Smoother;

/// Live-point allocation derived from an exploratory run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Schedule handed to the dynamic run.
    pub nlives: NliveSchedule,
    /// Index of the exploratory dead point where the smoothed importance peaks.
    pub peak_start_ind: usize,
    /// Smoothed, non-negative importance curve.
    pub importance: Vec<f64>,
    /// Importance before smoothing.
    pub importance_unsmoothed: Vec<f64>,
    /// Live-point curve before rounding.
    pub nlive_curve: Vec<f64>,
    /// Live-point count of the exploratory run (the schedule floor).
    pub ninit: usize,
    /// Samples the dynamic run is expected to add.
    pub dynamic_samples: f64,
}

/// Shrinkage of the log prior volume at each dead point, `1 / nlive`.
pub fn logx_widths(run: &RunRecord) -> Vec<f64> {
    run.dead_points()
        .iter()
        .map(|point| 1.0 / point.nlive_at_death.max(1) as f64)
        .collect()
}

/// Expected number of samples a live-point curve produces over the prior
/// volume covered by `run`.
pub fn expected_samples(nlive_curve: &[f64], run: &RunRecord) -> f64 {
    nlive_curve
        .iter()
        .zip(logx_widths(run))
        .map(|(nlive, width)| nlive * width)
        .sum()
}

/// Converts an exploratory run into a live-point schedule.
///
/// The smoothed importance curve is scaled so that, with the exploratory live
/// point count as a floor, the schedule is expected to draw
/// `target_samples - run.ndead()` samples over the run's prior volume.
pub fn allocate(
    run: &RunRecord,
    target_samples: f64,
    goal: f64,
    smoother: &dyn Smoother,
) -> Result<Allocation, DynError> {
    check_goal(goal)?;
    if run.is_empty() {
        return Err(DynError::Precondition(ErrorInfo::new(
            "empty-run",
            "exploratory run has no dead points",
        )));
    }
    let explored = run.ndead() as f64;
    if target_samples <= explored {
        return Err(DynError::Precondition(
            ErrorInfo::new(
                "no-samples-left",
                "all samples used in the exploratory run, none left for the dynamic run",
            )
            .with_context("target", target_samples.to_string())
            .with_context("ndead", run.ndead().to_string())
            .with_hint("raise max_ndead or nlive_const"),
        ));
    }

    let importance_unsmoothed = sample_importance(run, goal)?;
    let smoothed = smoother.smooth(&importance_unsmoothed);
    if smoothed.len() != importance_unsmoothed.len() {
        return Err(DynError::Usage(
            ErrorInfo::new("smoother-length", "smoothing changed the curve length")
                .with_context("input", importance_unsmoothed.len().to_string())
                .with_context("output", smoothed.len().to_string()),
        ));
    }
    let importance: Vec<f64> = smoothed
        .into_iter()
        .map(|v| if v.is_nan() { 0.0 } else { v.max(0.0) })
        .collect();
    let (peak_start_ind, peak) = importance
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (idx, value)| {
            if value > best.1 {
                (idx, value)
            } else {
                best
            }
        });
    if peak <= 0.0 {
        return Err(DynError::Precondition(ErrorInfo::new(
            "zero-importance",
            "smoothed importance is zero everywhere",
        )));
    }

    let ninit = run.nlive().into_iter().max().unwrap_or(1).max(1);
    let widths = logx_widths(run);
    let budget = target_samples - explored;
    let scale = solve_scale(&importance, &widths, ninit as f64, budget)?;
    let floor = ninit as f64;
    let nlive_curve: Vec<f64> = importance.iter().map(|imp| (scale * imp).max(floor)).collect();
    let dynamic_samples: f64 = nlive_curve.iter().zip(&widths).map(|(n, w)| n * w).sum();

    let nlives = NliveSchedule::new(
        run.dead_points()
            .iter()
            .zip(&nlive_curve)
            .map(|(point, nlive)| ScheduleEntry {
                threshold: point.log_likelihood,
                nlive: (nlive.round() as usize).max(ninit),
            })
            .collect(),
    );
    debug!(
        peak_start_ind,
        ninit,
        scale,
        budget,
        max_nlive = nlives.max_nlive().unwrap_or(ninit),
        "computed live-point allocation"
    );
    Ok(Allocation {
        nlives,
        peak_start_ind,
        importance,
        importance_unsmoothed,
        nlive_curve,
        ninit,
        dynamic_samples,
    })
}

/// Finds `c >= 0` with `sum_i max(c * imp_i, floor) * width_i == budget`.
///
/// The left-hand side is piecewise linear and non-decreasing in `c`, with a
/// breakpoint wherever `c * imp_i` crosses the floor; the segments are
/// walked in breakpoint order. A budget the floor alone meets or exceeds
/// has no solution and is a precondition error.
fn solve_scale(
    importance: &[f64],
    widths: &[f64],
    floor: f64,
    budget: f64,
) -> Result<f64, DynError> {
    let mut floor_mass: f64 = widths.iter().map(|w| floor * w).sum();
    if budget <= floor_mass {
        warn!(
            budget,
            floor_mass, "live-point floor alone exhausts the sample budget"
        );
        return Err(DynError::Precondition(
            ErrorInfo::new(
                "floor-exceeds-budget",
                "exploratory live-point count alone uses more samples than the budget",
            )
            .with_context("budget", budget.to_string())
            .with_context("floor_mass", floor_mass.to_string())
            .with_context("ninit", floor.to_string())
            .with_hint("raise nlive_const or max_ndead, or lower ninit"),
        ));
    }
    let mut order: Vec<usize> = (0..importance.len())
        .filter(|&idx| importance[idx] > 0.0)
        .collect();
    order.sort_by(|&a, &b| importance[b].total_cmp(&importance[a]));
    let mut scaled_mass = 0.0;
    for (rank, &idx) in order.iter().enumerate() {
        floor_mass -= floor * widths[idx];
        scaled_mass += importance[idx] * widths[idx];
        let scale = (budget - floor_mass) / scaled_mass;
        let next_break = order
            .get(rank + 1)
            .map(|&next| floor / importance[next])
            .unwrap_or(f64::INFINITY);
        if scale <= next_break {
            return Ok(scale);
        }
    }
    Err(DynError::Precondition(ErrorInfo::new(
        "zero-importance",
        "no positive importance to scale",
    )))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn scale_solves_the_piecewise_budget() {
        let importance = [1.0, 0.5, 0.1, 0.0];
        let widths = [0.1, 0.1, 0.1, 0.1];
        let scale = solve_scale(&importance, &widths, 5.0, 8.0).unwrap();
        let used: f64 = importance
            .iter()
            .zip(widths)
            .map(|(imp, w)| (scale * imp).max(5.0) * w)
            .sum();
        assert_relative_eq!(used, 8.0, epsilon = 1e-12);
    }

    #[test]
    fn floor_only_budget_is_a_precondition_error() {
        let err = solve_scale(&[1.0, 1.0], &[1.0, 1.0], 5.0, 9.0).unwrap_err();
        assert!(matches!(err, DynError::Precondition(_)));
        assert_eq!(err.info().code, "floor-exceeds-budget");
        assert_eq!(err.info().context.get("budget").map(String::as_str), Some("9"));
        assert_eq!(err.info().context.get("floor_mass").map(String::as_str), Some("10"));
    }
}
