//! Per-point importance of an exploratory run for the supported goals.

use dyns_core::errors::ErrorInfo;
use dyns_core::{DynError, RunRecord};

/// Posterior weights relative to the largest weight in the run.
fn relative_weights(run: &RunRecord) -> Vec<f64> {
    let logw = run.log_weights();
    let max = logw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return vec![0.0; logw.len()];
    }
    logw.iter().map(|w| (w - max).exp()).collect()
}

fn normalise_max(values: &mut [f64]) {
    let max = values.iter().copied().fold(0.0, f64::max);
    if max > 0.0 {
        values.iter_mut().for_each(|v| *v /= max);
    }
}

fn normalise_sum(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter().map(|v| v / total).collect()
    } else {
        values.to_vec()
    }
}

/// Importance of each point for the evidence estimate: the evidence still to
/// be accumulated from the point onwards, shared between the live points at
/// its death. Scaled so the largest value is one.
pub fn evidence_importance(run: &RunRecord) -> Vec<f64> {
    let weights = relative_weights(run);
    let mut remaining: f64 = weights.iter().sum();
    let mut importance = Vec::with_capacity(weights.len());
    for (weight, point) in weights.iter().zip(run.dead_points()) {
        importance.push(remaining.max(0.0) / point.nlive_at_death.max(1) as f64);
        remaining -= weight;
    }
    normalise_max(&mut importance);
    importance
}

/// Importance of each point for parameter estimation: its posterior weight,
/// scaled so the largest value is one.
pub fn param_importance(run: &RunRecord) -> Vec<f64> {
    let mut importance = relative_weights(run);
    normalise_max(&mut importance);
    importance
}

/// Mixes evidence and parameter importance according to `goal`.
///
/// `goal == 0` is pure evidence importance, `goal == 1` pure parameter
/// importance; in between both curves are normalised to unit sum and mixed
/// as `goal * param + (1 - goal) * evidence`.
pub fn sample_importance(run: &RunRecord, goal: f64) -> Result<Vec<f64>, DynError> {
    check_goal(goal)?;
    if goal == 0.0 {
        return Ok(evidence_importance(run));
    }
    if goal == 1.0 {
        return Ok(param_importance(run));
    }
    let evidence = normalise_sum(&evidence_importance(run));
    let param = normalise_sum(&param_importance(run));
    Ok(evidence
        .iter()
        .zip(param.iter())
        .map(|(z, p)| goal * p + (1.0 - goal) * z)
        .collect())
}

/// Rejects goals outside `[0, 1]`.
pub fn check_goal(goal: f64) -> Result<(), DynError> {
    if (0.0..=1.0).contains(&goal) {
        Ok(())
    } else {
        Err(DynError::Usage(
            ErrorInfo::new("goal-range", "dynamic goal must lie in [0, 1]")
                .with_context("goal", goal.to_string()),
        ))
    }
}
