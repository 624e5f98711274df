//! Loading of sampler output files into [`RunRecord`] values.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use dyns_core::errors::ErrorInfo;
use dyns_core::{DeadPoint, DynError, RunPaths, RunRecord, RunStats, ThreadBounds, ThreadLabel};

/// Birth contours at or below this value mark points drawn from the prior.
pub const PRIOR_BIRTH_CUTOFF: f64 = -1e30;

/// Reads the summary statistics of the run rooted at `file_root`.
pub fn read_stats(file_root: &str, base_dir: &Path) -> Result<RunStats, DynError> {
    let path = RunPaths::new(base_dir, file_root).stats();
    let contents =
        fs::read_to_string(&path).map_err(|err| DynError::io("stats-read", err, &path))?;
    serde_json::from_str(&contents).map_err(|err| DynError::serde("stats-parse", err, &path))
}

struct Row {
    parameters: Vec<f64>,
    logl: f64,
    birth: f64,
}

fn parse_dead_birth(path: &Path) -> Result<Vec<Row>, DynError> {
    let contents =
        fs::read_to_string(path).map_err(|err| DynError::io("dead-birth-read", err, path))?;
    let mut rows = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let values = line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                DynError::Serde(
                    ErrorInfo::new("dead-birth-parse", err.to_string())
                        .with_context("path", path.display().to_string())
                        .with_context("line", (idx + 1).to_string()),
                )
            })?;
        if values.len() < 2 {
            return Err(DynError::Serde(
                ErrorInfo::new("dead-birth-columns", "row needs a likelihood and a birth contour")
                    .with_context("path", path.display().to_string())
                    .with_context("line", (idx + 1).to_string()),
            ));
        }
        let split = values.len() - 2;
        rows.push(Row {
            parameters: values[..split].to_vec(),
            logl: values[split],
            birth: values[split + 1],
        });
    }
    Ok(rows)
}

/// Reads the dead-birth file of the run rooted at `file_root` and
/// reconstructs its threads.
///
/// A point born at the likelihood of an earlier point continues that point's
/// thread; any further points born at the same contour open new threads
/// starting there. Points drawn from the prior open threads starting at
/// `-inf`.
pub fn read_full_run(file_root: &str, base_dir: &Path) -> Result<RunRecord, DynError> {
    let paths = RunPaths::new(base_dir, file_root);
    let stats = read_stats(file_root, base_dir)?;
    let mut rows = parse_dead_birth(&paths.dead_birth())?;
    rows.sort_by(|a, b| a.logl.total_cmp(&b.logl));

    let mut tips: HashMap<u64, ThreadLabel> = HashMap::new();
    let mut bounds: BTreeMap<ThreadLabel, ThreadBounds> = BTreeMap::new();
    let mut points = Vec::with_capacity(rows.len());
    let mut next_label: ThreadLabel = 0;
    for row in rows {
        let from_prior = row.birth <= PRIOR_BIRTH_CUTOFF || row.birth.is_nan();
        let continued = if from_prior {
            None
        } else {
            tips.remove(&row.birth.to_bits())
        };
        let label = match continued {
            Some(label) => label,
            None => {
                let label = next_label;
                next_label += 1;
                let min = if from_prior { f64::NEG_INFINITY } else { row.birth };
                bounds.insert(label, ThreadBounds::new(min, row.logl));
                label
            }
        };
        if let Some(thread) = bounds.get_mut(&label) {
            thread.max = row.logl;
        }
        tips.insert(row.logl.to_bits(), label);
        points.push(DeadPoint {
            log_likelihood: row.logl,
            parameters: row.parameters,
            thread_label: label,
            nlive_at_death: 0,
        });
    }
    RunRecord::from_threads(points, bounds, stats)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn write_run(dir: &Path, root: &str, rows: &str) {
        let paths = RunPaths::new(dir, root);
        fs::write(paths.dead_birth(), rows).unwrap();
        fs::write(paths.stats(), r#"{"ndead": 4, "nlike": 17}"#).unwrap();
    }

    #[test]
    fn threads_follow_birth_contours() {
        let dir = tempdir().unwrap();
        write_run(
            dir.path(),
            "toy",
            "0.1 1e0 -1e30\n0.2 0e0 -1e30\n0.3 3e0 1e0\n0.4 2e0 0e0\n",
        );
        let run = read_full_run("toy", dir.path()).unwrap();
        assert_eq!(run.log_likelihoods(), vec![0.0, 1.0, 2.0, 3.0]);
        let labels: Vec<_> = run.dead_points().iter().map(|p| p.thread_label).collect();
        assert_eq!(labels, vec![0, 1, 0, 1]);
        assert_eq!(run.nlive(), vec![2, 2, 2, 1]);
        assert_eq!(run.nlike(), 17);
        assert_eq!(run.dead_points()[2].parameters, vec![0.4]);
    }

    #[test]
    fn shared_births_open_new_threads() {
        let dir = tempdir().unwrap();
        write_run(
            dir.path(),
            "grow",
            "0 0 -1e30\n0 1 0\n0 2 0\n0 3 0\n",
        );
        let run = read_full_run("grow", dir.path()).unwrap();
        assert_eq!(run.thread_bounds().len(), 3);
        assert_eq!(run.nlive(), vec![1, 3, 2, 1]);
    }

    #[test]
    fn missing_files_are_io_errors() {
        let dir = tempdir().unwrap();
        let err = read_full_run("absent", dir.path()).unwrap_err();
        assert!(matches!(err, DynError::Io(_)));
        assert_eq!(err.info().code, "stats-read");
    }

    #[test]
    fn corrupt_rows_are_serde_errors() {
        let dir = tempdir().unwrap();
        write_run(dir.path(), "bad", "0.1 nope -1e30\n");
        let err = read_full_run("bad", dir.path()).unwrap_err();
        assert_eq!(err.info().code, "dead-birth-parse");
        assert_eq!(err.info().context.get("line").map(String::as_str), Some("1"));
    }
}
