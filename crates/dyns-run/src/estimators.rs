//! Posterior and evidence estimators over a run.

use dyns_core::errors::ErrorInfo;
use dyns_core::{log_sum_exp, DynError, RunRecord};

/// Number of samples in the run.
pub fn count_samples(run: &RunRecord) -> usize {
    run.ndead()
}

/// Log-evidence estimate `ln(sum_i w_i)`.
pub fn logz(run: &RunRecord) -> f64 {
    log_sum_exp(&run.log_weights())
}

/// Posterior mean of parameter `index`.
pub fn param_mean(run: &RunRecord, index: usize) -> Result<f64, DynError> {
    let logw = run.log_weights();
    let norm = log_sum_exp(&logw);
    if !norm.is_finite() {
        return Err(DynError::Precondition(ErrorInfo::new(
            "no-posterior-mass",
            "run has no finite posterior weight",
        )));
    }
    let mut mean = 0.0;
    for (point, w) in run.dead_points().iter().zip(&logw) {
        let value = point.parameters.get(index).copied().ok_or_else(|| {
            DynError::Usage(
                ErrorInfo::new("param-index", "parameter index out of range")
                    .with_context("index", index.to_string())
                    .with_context("ndim", point.parameters.len().to_string()),
            )
        })?;
        mean += (w - norm).exp() * value;
    }
    Ok(mean)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use approx::assert_relative_eq;
    use dyns_core::{DeadPoint, RunStats, ThreadBounds};

    use super::*;

    fn flat_run(values: &[f64]) -> RunRecord {
        let points = values
            .iter()
            .enumerate()
            .map(|(idx, v)| DeadPoint {
                log_likelihood: idx as f64 * 1e-9,
                parameters: vec![*v],
                thread_label: 0,
                nlive_at_death: 0,
            })
            .collect();
        let bounds = BTreeMap::from([(0, ThreadBounds::new(f64::NEG_INFINITY, 1.0))]);
        RunRecord::from_threads(points, bounds, RunStats::default()).unwrap()
    }

    #[test]
    fn single_thread_volume_shrinks_by_e() {
        let run = flat_run(&[1.0, 3.0]);
        assert_eq!(count_samples(&run), 2);
        let e = std::f64::consts::E;
        let (w1, w2) = (1.0 - 1.0 / e, 1.0 / e - 1.0 / (e * e));
        assert_relative_eq!(logz(&run), (w1 + w2).ln(), epsilon = 1e-6);
        assert_relative_eq!(
            param_mean(&run, 0).unwrap(),
            (w1 + 3.0 * w2) / (w1 + w2),
            epsilon = 1e-6
        );
    }

    #[test]
    fn out_of_range_parameter_is_a_usage_error() {
        let err = param_mean(&flat_run(&[1.0]), 2).unwrap_err();
        assert_eq!(err.info().code, "param-index");
    }
}
