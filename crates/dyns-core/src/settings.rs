use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One step of a live-point schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Log-likelihood contour from which the count applies.
    pub threshold: f64,
    /// Target number of live points above the threshold.
    pub nlive: usize,
}

/// Live-point counts keyed by log-likelihood threshold, in threshold order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NliveSchedule {
    entries: Vec<ScheduleEntry>,
}

impl NliveSchedule {
    /// Builds a schedule, sorting the entries by threshold.
    pub fn new(mut entries: Vec<ScheduleEntry>) -> Self {
        entries.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));
        Self { entries }
    }

    /// Returns the entries in threshold order.
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// Returns true when no schedule is attached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of thresholds in the schedule.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Largest live-point count requested anywhere.
    pub fn max_nlive(&self) -> Option<usize> {
        self.entries.iter().map(|entry| entry.nlive).max()
    }

    /// Smallest live-point count requested anywhere.
    pub fn min_nlive(&self) -> Option<usize> {
        self.entries.iter().map(|entry| entry.nlive).min()
    }

    /// Target count at a contour: the entry with the greatest threshold not
    /// above `log_likelihood`, or the first entry below the schedule.
    pub fn nlive_at(&self, log_likelihood: f64) -> Option<usize> {
        let idx = self
            .entries
            .partition_point(|entry| entry.threshold <= log_likelihood);
        let entry = if idx == 0 {
            self.entries.first()
        } else {
            self.entries.get(idx - 1)
        };
        entry.map(|entry| entry.nlive)
    }
}

/// Settings for a single sampler invocation.
///
/// Values are built per phase with the `with_*` helpers and never mutated
/// once handed to a [`crate::Sampler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplerSettings {
    /// Constant number of live points (or the minimum when a schedule is set).
    #[serde(default = "default_nlive")]
    pub nlive: usize,
    /// Optional live-point schedule.
    #[serde(default)]
    pub nlives: NliveSchedule,
    /// Prefix for every output file of the run.
    #[serde(default = "default_file_root")]
    pub file_root: String,
    /// Directory that holds the run outputs.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Random seed; negative values leave seeding to the sampler.
    #[serde(default = "default_seed")]
    pub seed: i64,
    /// Maximum number of dead points (`-1` runs to completion).
    #[serde(default = "default_max_ndead")]
    pub max_ndead: i64,
    /// Write a resume file when the run stops.
    #[serde(default)]
    pub write_resume: bool,
    /// Start from the resume file instead of sampling the prior.
    #[serde(default)]
    pub read_resume: bool,
    /// Stop once the live points hold less than this fraction of the evidence.
    #[serde(default = "default_precision_criterion")]
    pub precision_criterion: f64,
}

fn default_nlive() -> usize {
    100
}

fn default_file_root() -> String {
    "temp".to_string()
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("chains")
}

fn default_seed() -> i64 {
    -1
}

fn default_max_ndead() -> i64 {
    -1
}

fn default_precision_criterion() -> f64 {
    0.001
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            nlive: default_nlive(),
            nlives: NliveSchedule::default(),
            file_root: default_file_root(),
            base_dir: default_base_dir(),
            seed: default_seed(),
            max_ndead: default_max_ndead(),
            write_resume: false,
            read_resume: false,
            precision_criterion: default_precision_criterion(),
        }
    }
}

impl SamplerSettings {
    /// Returns the file locations implied by `base_dir` and `file_root`.
    pub fn paths(&self) -> RunPaths {
        RunPaths::new(&self.base_dir, &self.file_root)
    }

    /// Returns a copy with a different file root.
    pub fn with_file_root(mut self, file_root: impl Into<String>) -> Self {
        self.file_root = file_root.into();
        self
    }

    /// Returns a copy with a different constant live-point count.
    pub fn with_nlive(mut self, nlive: usize) -> Self {
        self.nlive = nlive;
        self
    }

    /// Returns a copy carrying the supplied schedule.
    pub fn with_schedule(mut self, nlives: NliveSchedule) -> Self {
        self.nlives = nlives;
        self
    }

    /// Returns a copy with a different seed.
    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    /// Returns a copy with a different dead-point cap.
    pub fn with_max_ndead(mut self, max_ndead: i64) -> Self {
        self.max_ndead = max_ndead;
        self
    }

    /// Returns a copy with the resume flags set.
    pub fn with_resume(mut self, write_resume: bool, read_resume: bool) -> Self {
        self.write_resume = write_resume;
        self.read_resume = read_resume;
        self
    }

    /// Dead-point cap as an option (`None` when unbounded).
    pub fn ndead_cap(&self) -> Option<usize> {
        usize::try_from(self.max_ndead).ok().filter(|cap| *cap > 0)
    }
}

/// File layout for the outputs of one run, rooted at `base_dir/file_root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    base_dir: PathBuf,
    file_root: String,
}

impl RunPaths {
    /// Creates the layout for a file root inside a base directory.
    pub fn new(base_dir: &Path, file_root: &str) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            file_root: file_root.to_string(),
        }
    }

    /// Base directory of the run.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// File root of the run.
    pub fn file_root(&self) -> &str {
        &self.file_root
    }

    fn file(&self, suffix: &str) -> PathBuf {
        self.base_dir.join(format!("{}{}", self.file_root, suffix))
    }

    /// Dead points with birth contours.
    pub fn dead_birth(&self) -> PathBuf {
        self.file("_dead-birth.txt")
    }

    /// Summary statistics.
    pub fn stats(&self) -> PathBuf {
        self.file(".stats")
    }

    /// Sampler-owned resume file.
    pub fn resume(&self) -> PathBuf {
        self.file(".resume")
    }

    /// Copy of the resume file taken after `ndead` dead points.
    pub fn step_resume(&self, ndead: usize) -> PathBuf {
        self.file(&format!("_{ndead}.resume"))
    }

    /// Allocation metadata of a dynamic run.
    pub fn dyn_info(&self) -> PathBuf {
        self.file("_dyn_info")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_lookup_uses_greatest_threshold_below() {
        let schedule = NliveSchedule::new(vec![
            ScheduleEntry {
                threshold: 1.0,
                nlive: 20,
            },
            ScheduleEntry {
                threshold: -3.0,
                nlive: 5,
            },
        ]);
        assert_eq!(schedule.nlive_at(-10.0), Some(5));
        assert_eq!(schedule.nlive_at(0.0), Some(5));
        assert_eq!(schedule.nlive_at(1.0), Some(20));
        assert_eq!(schedule.max_nlive(), Some(20));
        assert_eq!(NliveSchedule::default().nlive_at(0.0), None);
    }

    #[test]
    fn unknown_setting_keys_are_rejected() {
        let err = serde_json::from_str::<SamplerSettings>(r#"{"nlive": 10, "bogus": 1}"#);
        assert!(err.is_err());
    }

    #[test]
    fn paths_follow_file_root() {
        let paths = SamplerSettings::default()
            .with_file_root("gauss_init")
            .paths();
        assert_eq!(paths.resume(), PathBuf::from("chains/gauss_init.resume"));
        assert_eq!(
            paths.step_resume(20),
            PathBuf::from("chains/gauss_init_20.resume")
        );
    }
}
