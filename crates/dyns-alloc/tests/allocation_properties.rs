use std::collections::BTreeMap;

use approx::assert_relative_eq;
use dyns_alloc::{allocate, expected_samples, logx_widths, NoSmoothing, SavitzkyGolay};
use dyns_core::{DeadPoint, DynError, RunRecord, RunStats, ThreadBounds};
use proptest::prelude::*;

/// Constant-nlive run over a Gaussian-like likelihood: `ninit` threads
/// sampled from the prior, each point continuing its thread.
fn exploratory_run(ninit: usize, ndead: usize, width: f64) -> RunRecord {
    let mut last = vec![f64::NEG_INFINITY; ninit];
    let points: Vec<DeadPoint> = (0..ndead)
        .map(|i| {
            let logx = -(i as f64 + 1.0) / ninit as f64;
            let logl = -(2.0 * logx).exp() / (2.0 * width * width);
            let label = i % ninit;
            last[label] = logl;
            DeadPoint {
                log_likelihood: logl,
                parameters: vec![logx.exp()],
                thread_label: label as u32,
                nlive_at_death: 0,
            }
        })
        .collect();
    let bounds: BTreeMap<u32, ThreadBounds> = last
        .iter()
        .enumerate()
        .map(|(label, max)| (label as u32, ThreadBounds::new(f64::NEG_INFINITY, *max)))
        .collect();
    RunRecord::from_threads(points, bounds, RunStats::default()).unwrap()
}

#[test]
fn allocation_needs_samples_beyond_the_exploratory_run() {
    let run = exploratory_run(5, 60, 0.1);
    for target in [10.0, 59.0, 60.0] {
        let err = allocate(&run, target, 0.0, &NoSmoothing).unwrap_err();
        assert!(matches!(err, DynError::Precondition(_)));
        assert_eq!(err.info().code, "no-samples-left");
    }
}

#[test]
fn parameter_goal_moves_the_peak_away_from_the_start() {
    let run = exploratory_run(10, 300, 0.1);
    let evidence = allocate(&run, 1500.0, 0.0, &NoSmoothing).unwrap();
    let param = allocate(&run, 1500.0, 1.0, &NoSmoothing).unwrap();
    assert_eq!(evidence.peak_start_ind, 0);
    assert!(param.peak_start_ind > 0);
    let nlive_at_peak = param.nlives.entries()[param.peak_start_ind].nlive;
    assert_eq!(param.nlives.max_nlive(), Some(nlive_at_peak));
}

#[test]
fn schedule_thresholds_follow_the_exploratory_run() {
    let run = exploratory_run(5, 80, 0.2);
    let alloc = allocate(&run, 400.0, 0.5, &NoSmoothing).unwrap();
    let thresholds: Vec<f64> = alloc.nlives.entries().iter().map(|e| e.threshold).collect();
    assert_eq!(thresholds, run.log_likelihoods());
    assert_eq!(alloc.importance.len(), run.ndead());
}

#[test]
fn smoothing_that_changes_length_is_rejected() {
    let run = exploratory_run(5, 40, 0.2);
    let truncate = |values: &[f64]| values[1..].to_vec();
    let err = allocate(&run, 200.0, 1.0, &truncate).unwrap_err();
    assert_eq!(err.info().code, "smoother-length");
}

#[test]
fn floor_above_budget_is_a_precondition_error() {
    // Two live points over 40 dead points: the floor alone expects about 41
    // samples, far beyond the 12 the target leaves.
    let run = exploratory_run(2, 40, 0.2);
    let err = allocate(&run, 52.0, 1.0, &SavitzkyGolay::for_ninit(2).unwrap()).unwrap_err();
    assert!(matches!(err, DynError::Precondition(_)));
    assert_eq!(err.info().code, "floor-exceeds-budget");
    assert_eq!(err.info().context.get("budget").map(String::as_str), Some("12"));

    let run = exploratory_run(5, 60, 0.2);
    let err = allocate(&run, 90.0, 0.5, &SavitzkyGolay::for_ninit(5).unwrap()).unwrap_err();
    assert_eq!(err.info().code, "floor-exceeds-budget");
}

proptest! {
    #[test]
    fn schedule_respects_floor_and_budget(
        ninit in 2usize..12,
        per_thread in 8usize..30,
        multiplier in 1.05f64..10.0,
        goal in 0.0f64..=1.0,
        width in 0.05f64..0.5,
    ) {
        let ndead = ninit * per_thread;
        let run = exploratory_run(ninit, ndead, width);
        let target = ndead as f64 * multiplier;
        let budget = target - ndead as f64;
        let widths = logx_widths(&run);
        let floor_mass: f64 = widths.iter().map(|w| ninit as f64 * w).sum();
        let smoother = SavitzkyGolay::for_ninit(ninit).unwrap();

        if budget <= floor_mass {
            let err = allocate(&run, target, goal, &smoother).unwrap_err();
            prop_assert_eq!(err.info().code.as_str(), "floor-exceeds-budget");
            return Ok(());
        }
        let alloc = allocate(&run, target, goal, &smoother).unwrap();

        prop_assert_eq!(alloc.ninit, ninit);
        prop_assert!(alloc.nlives.entries().iter().all(|e| e.nlive >= ninit));
        prop_assert!(alloc.nlive_curve.iter().all(|n| *n >= ninit as f64));
        prop_assert!(alloc.importance.iter().all(|v| *v >= 0.0));
        prop_assert!(alloc.peak_start_ind < ndead);

        let curve_integral = expected_samples(&alloc.nlive_curve, &run);
        assert_relative_eq!(curve_integral, budget, max_relative = 1e-9);
        assert_relative_eq!(curve_integral, alloc.dynamic_samples, max_relative = 1e-12);

        // Rounding moves each count by at most one half.
        let scheduled: Vec<f64> = alloc.nlives.entries().iter().map(|e| e.nlive as f64).collect();
        let schedule_integral = expected_samples(&scheduled, &run);
        let rounding_slack: f64 = 0.5 * widths.iter().sum::<f64>();
        prop_assert!(
            (schedule_integral - budget).abs() <= rounding_slack + 1e-9 * budget,
            "schedule integral {} budget {} slack {}",
            schedule_integral,
            budget,
            rounding_slack
        );
    }
}
