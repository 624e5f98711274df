use std::fs;
use std::io::Write;
use std::path::Path;

use dyns_core::{DynError, RunPaths, RunStats};
use serde::{Deserialize, Serialize};

/// Log-likelihood recorded for points drawn from the whole prior.
pub const LOG_ZERO: f64 = -1e30;

/// A point of the live set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivePoint {
    /// Hypercube coordinates.
    pub cube: Vec<f64>,
    /// Physical parameters.
    pub theta: Vec<f64>,
    /// Log-likelihood of the point.
    pub logl: f64,
    /// Contour the point was drawn above.
    pub birth: f64,
}

/// Complete sampler state, persisted as the resume file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerState {
    /// Dimension of the hypercube.
    pub ndim: usize,
    /// Current live points.
    pub live: Vec<LivePoint>,
    /// Dead points in order of death.
    pub dead: Vec<LivePoint>,
    /// Live-point count at the death of each dead point.
    pub dead_nlive: Vec<usize>,
    /// Likelihood evaluations so far.
    pub nlike: u64,
    /// Expected log prior volume enclosed by the latest contour.
    pub logx: f64,
    /// Log-evidence accumulated from dead points.
    pub logz_dead: f64,
    /// Master seed the run draws its substreams from.
    pub master_seed: u64,
    /// True once the termination criterion has fired.
    pub finished: bool,
}

impl SamplerState {
    /// Restores a state from a resume file.
    pub fn load(path: &Path) -> Result<Self, DynError> {
        let contents =
            fs::read_to_string(path).map_err(|err| DynError::io("resume-read", err, path))?;
        serde_json::from_str(&contents).map_err(|err| DynError::serde("resume-parse", err, path))
    }

    /// Writes the state to a resume file.
    pub fn store(&self, path: &Path) -> Result<(), DynError> {
        ensure_parent(path)?;
        let json = serde_json::to_string(self)
            .map_err(|err| DynError::serde("resume-serialize", err, path))?;
        fs::write(path, json).map_err(|err| DynError::io("resume-write", err, path))
    }
}

fn ensure_parent(path: &Path) -> Result<(), DynError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| DynError::io("output-mkdir", err, parent))?;
    }
    Ok(())
}

/// Writes the dead-birth file: one row per point with the parameters, the
/// log-likelihood and the birth contour.
pub fn write_dead_birth(paths: &RunPaths, points: &[&LivePoint]) -> Result<(), DynError> {
    let path = paths.dead_birth();
    ensure_parent(&path)?;
    let mut file = fs::File::create(&path).map_err(|err| DynError::io("dead-birth-create", err, &path))?;
    for point in points {
        let mut row: Vec<String> = point.theta.iter().map(|th| format!("{th:e}")).collect();
        row.push(format!("{:e}", point.logl));
        row.push(format!("{:e}", point.birth));
        writeln!(file, "{}", row.join(" "))
            .map_err(|err| DynError::io("dead-birth-write", err, &path))?;
    }
    Ok(())
}

/// Writes the summary statistics file.
pub fn write_stats(paths: &RunPaths, stats: &RunStats) -> Result<(), DynError> {
    let path = paths.stats();
    ensure_parent(&path)?;
    let json = serde_json::to_string_pretty(stats)
        .map_err(|err| DynError::serde("stats-serialize", err, &path))?;
    fs::write(&path, json).map_err(|err| DynError::io("stats-write", err, &path))
}
