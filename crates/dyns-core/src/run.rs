//! In-memory representation of a (possibly partial) nested sampling run.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::{DynError, ErrorInfo};

/// Label identifying the live-point thread that produced a dead point.
pub type ThreadLabel = u32;

/// A single sample removed from the live set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadPoint {
    /// Log-likelihood at which the point died.
    pub log_likelihood: f64,
    /// Physical parameter vector of the point.
    pub parameters: Vec<f64>,
    /// Thread the point belongs to.
    pub thread_label: ThreadLabel,
    /// Number of live points when the point died.
    pub nlive_at_death: usize,
}

/// Log-likelihood range `(min, max]` covered by one thread.
///
/// `min` is the contour the first point of the thread was born at and is
/// `-inf` for threads sampled from the whole prior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreadBounds {
    /// Birth contour of the first point in the thread.
    pub min: f64,
    /// Log-likelihood of the last point in the thread.
    pub max: f64,
}

impl ThreadBounds {
    /// Creates bounds for a thread.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns true when the thread was live at the supplied contour.
    pub fn contains(&self, log_likelihood: f64) -> bool {
        self.min < log_likelihood && log_likelihood <= self.max
    }
}

/// Summary statistics written by a sampler adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Number of points in the dead-point file (including final live points).
    pub ndead: usize,
    /// Number of likelihood evaluations performed.
    pub nlike: u64,
    /// Sampler estimate of the log-evidence, when reported.
    #[serde(default)]
    pub logz: Option<f64>,
    /// Sampler estimate of the log-evidence uncertainty, when reported.
    #[serde(default)]
    pub logz_err: Option<f64>,
}

/// A nested sampling run: ordered dead points plus thread bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    dead_points: Vec<DeadPoint>,
    thread_bounds: BTreeMap<ThreadLabel, ThreadBounds>,
    stats: RunStats,
}

impl RunRecord {
    /// Builds a run from dead points and thread bounds.
    ///
    /// Points are sorted by log-likelihood and `nlive_at_death` is derived
    /// from the thread bounds, so callers only need to supply likelihoods,
    /// parameters and labels.
    pub fn from_threads(
        mut dead_points: Vec<DeadPoint>,
        thread_bounds: BTreeMap<ThreadLabel, ThreadBounds>,
        stats: RunStats,
    ) -> Result<Self, DynError> {
        for point in &dead_points {
            if point.log_likelihood.is_nan() {
                return Err(DynError::Consistency(ErrorInfo::new(
                    "nan-likelihood",
                    "dead point has a NaN log-likelihood",
                )));
            }
            if !thread_bounds.contains_key(&point.thread_label) {
                return Err(DynError::Consistency(
                    ErrorInfo::new("unknown-thread", "dead point references a thread without bounds")
                        .with_context("thread", point.thread_label.to_string()),
                ));
            }
        }
        dead_points.sort_by(|a, b| a.log_likelihood.total_cmp(&b.log_likelihood));
        let mut run = Self {
            dead_points,
            thread_bounds,
            stats,
        };
        run.recompute_nlive();
        Ok(run)
    }

    /// Returns the dead points in likelihood order.
    pub fn dead_points(&self) -> &[DeadPoint] {
        &self.dead_points
    }

    /// Returns the per-thread likelihood ranges.
    pub fn thread_bounds(&self) -> &BTreeMap<ThreadLabel, ThreadBounds> {
        &self.thread_bounds
    }

    /// Returns the sampler statistics attached to the run.
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Replaces the attached statistics.
    pub fn set_stats(&mut self, stats: RunStats) {
        self.stats = stats;
    }

    /// Number of dead points held in memory.
    pub fn ndead(&self) -> usize {
        self.dead_points.len()
    }

    /// Total likelihood evaluations reported by the sampler.
    pub fn nlike(&self) -> u64 {
        self.stats.nlike
    }

    /// Returns true when the run holds no dead points.
    pub fn is_empty(&self) -> bool {
        self.dead_points.is_empty()
    }

    /// Log-likelihoods of all dead points.
    pub fn log_likelihoods(&self) -> Vec<f64> {
        self.dead_points.iter().map(|p| p.log_likelihood).collect()
    }

    /// Live-point counts at death of all dead points.
    pub fn nlive(&self) -> Vec<usize> {
        self.dead_points.iter().map(|p| p.nlive_at_death).collect()
    }

    /// Largest thread label in use, if any.
    pub fn max_thread_label(&self) -> Option<ThreadLabel> {
        self.thread_bounds.keys().next_back().copied()
    }

    /// Recomputes `nlive_at_death` from the thread bounds.
    pub fn recompute_nlive(&mut self) {
        let mut mins: Vec<f64> = self.thread_bounds.values().map(|b| b.min).collect();
        let mut maxs: Vec<f64> = self.thread_bounds.values().map(|b| b.max).collect();
        mins.sort_by(f64::total_cmp);
        maxs.sort_by(f64::total_cmp);
        for point in &mut self.dead_points {
            let logl = point.log_likelihood;
            let started = mins.partition_point(|&min| min < logl);
            let finished = maxs.partition_point(|&max| max < logl);
            point.nlive_at_death = started - finished;
        }
    }

    /// Expected log prior volume remaining after each dead point.
    pub fn log_x(&self) -> Vec<f64> {
        let mut logx = Vec::with_capacity(self.dead_points.len());
        let mut acc = 0.0;
        for point in &self.dead_points {
            acc -= 1.0 / point.nlive_at_death.max(1) as f64;
            logx.push(acc);
        }
        logx
    }

    /// Log posterior weight `ln(L_i (X_{i-1} - X_i))` of each dead point.
    pub fn log_weights(&self) -> Vec<f64> {
        let mut logw = Vec::with_capacity(self.dead_points.len());
        let mut prev_logx = 0.0;
        for point in &self.dead_points {
            let shrink = 1.0 / point.nlive_at_death.max(1) as f64;
            // ln(X_{i-1} - X_i) = ln X_{i-1} + ln(1 - e^{-shrink})
            let log_dx = prev_logx + (-(-shrink).exp_m1()).ln();
            logw.push(point.log_likelihood + log_dx);
            prev_logx -= shrink;
        }
        logw
    }

    /// Checks the ordering and identity invariants of the run.
    pub fn check_invariants(&self) -> Result<(), DynError> {
        for (idx, pair) in self.dead_points.windows(2).enumerate() {
            if pair[1].log_likelihood < pair[0].log_likelihood {
                return Err(DynError::Consistency(
                    ErrorInfo::new("non-monotone", "dead points are not ordered by likelihood")
                        .with_context("index", (idx + 1).to_string()),
                ));
            }
        }
        let mut seen = BTreeSet::new();
        for point in &self.dead_points {
            if !seen.insert((point.thread_label, point.log_likelihood.to_bits())) {
                return Err(DynError::Consistency(
                    ErrorInfo::new("duplicate-point", "two dead points share thread and likelihood")
                        .with_context("thread", point.thread_label.to_string())
                        .with_context("logl", point.log_likelihood.to_string()),
                ));
            }
        }
        Ok(())
    }
}

/// `ln(sum(exp(values)))` without overflow.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(logl: f64, label: ThreadLabel) -> DeadPoint {
        DeadPoint {
            log_likelihood: logl,
            parameters: vec![logl],
            thread_label: label,
            nlive_at_death: 0,
        }
    }

    #[test]
    fn nlive_follows_thread_bounds() {
        let points = vec![point(0.0, 0), point(1.0, 1), point(2.0, 0), point(3.0, 1)];
        let bounds = BTreeMap::from([
            (0, ThreadBounds::new(f64::NEG_INFINITY, 2.0)),
            (1, ThreadBounds::new(f64::NEG_INFINITY, 3.0)),
        ]);
        let run = RunRecord::from_threads(points, bounds, RunStats::default()).unwrap();
        assert_eq!(run.nlive(), vec![2, 2, 2, 1]);
        run.check_invariants().unwrap();
    }

    #[test]
    fn weights_sum_to_prior_mass_for_flat_likelihood() {
        let points: Vec<_> = (0..200).map(|i| point(0.0 + i as f64 * 1e-12, 0)).collect();
        let bounds = BTreeMap::from([(0, ThreadBounds::new(f64::NEG_INFINITY, 1.0))]);
        let run = RunRecord::from_threads(points, bounds, RunStats::default()).unwrap();
        let mass: f64 = run.log_weights().iter().map(|w| w.exp()).sum();
        let remaining = run.log_x().last().unwrap().exp();
        assert!((mass + remaining - 1.0).abs() < 1e-9);
    }

    #[test]
    fn missing_thread_bounds_are_rejected() {
        let err = RunRecord::from_threads(vec![point(0.0, 4)], BTreeMap::new(), RunStats::default())
            .unwrap_err();
        assert_eq!(err.info().code, "unknown-thread");
    }
}
