use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use dyns_core::errors::ErrorInfo;
use dyns_core::{DynError, RunPaths, RunStats};
use tracing::debug;

/// Resume-file snapshot taken during the exploratory run.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointEntry {
    /// Dead points the sampler had produced when the snapshot was taken.
    pub ndead: usize,
    /// Step-indexed copy of the resume file.
    pub path: PathBuf,
    /// Run statistics at the snapshot.
    pub stats: RunStats,
}

/// Checkpoints of one exploratory run, keyed by dead-point count.
///
/// The registry owns the step-indexed resume files it creates and removes
/// them in [`CheckpointRegistry::remove_files`].
#[derive(Debug, Clone)]
pub struct CheckpointRegistry {
    paths: RunPaths,
    entries: BTreeMap<usize, CheckpointEntry>,
}

impl CheckpointRegistry {
    /// Creates an empty registry for the run at `paths`.
    pub fn new(paths: RunPaths) -> Self {
        Self {
            paths,
            entries: BTreeMap::new(),
        }
    }

    /// Copies the run's current resume file to its step-indexed name and
    /// records it.
    pub fn record(&mut self, ndead: usize, stats: RunStats) -> Result<&CheckpointEntry, DynError> {
        let source = self.paths.resume();
        let path = self.paths.step_resume(ndead);
        copy_durably(&source, &path)?;
        debug!(ndead, path = %path.display(), "registered checkpoint");
        let entry = CheckpointEntry { ndead, path, stats };
        self.entries.insert(ndead, entry);
        Ok(&self.entries[&ndead])
    }

    /// Latest checkpoint whose last dead point precedes `peak_index`.
    pub fn latest_before(&self, peak_index: usize) -> Option<&CheckpointEntry> {
        // last dead index of a checkpoint is ndead - 1, so ndead <= peak
        self.entries
            .range(..=peak_index)
            .next_back()
            .map(|(_, entry)| entry)
    }

    /// Registered checkpoints in dead-point order.
    pub fn entries(&self) -> impl Iterator<Item = &CheckpointEntry> {
        self.entries.values()
    }

    /// Number of registered checkpoints.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deletes every step-indexed resume file, consuming the registry.
    pub fn remove_files(self) -> Result<usize, DynError> {
        let mut removed = 0;
        for entry in self.entries.into_values() {
            if remove_if_present(&entry.path)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Copies `source` to `dest` and flushes the copy to disk.
pub fn copy_durably(source: &Path, dest: &Path) -> Result<(), DynError> {
    fs::copy(source, dest).map_err(|err| {
        DynError::Io(
            ErrorInfo::new("checkpoint-copy", err.to_string())
                .with_context("path", source.display().to_string())
                .with_context("dest", dest.display().to_string()),
        )
    })?;
    let file = fs::File::open(dest).map_err(|err| DynError::io("checkpoint-open", err, dest))?;
    file.sync_all()
        .map_err(|err| DynError::io("checkpoint-sync", err, dest))
}

/// Removes a file, treating a missing file as success.
///
/// Returns whether a file was deleted.
pub fn remove_if_present(path: &Path) -> Result<bool, DynError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(DynError::io("remove-file", err, path)),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn registry_with(dir: &Path, counts: &[usize]) -> CheckpointRegistry {
        let paths = RunPaths::new(dir, "gauss_init");
        let mut registry = CheckpointRegistry::new(paths.clone());
        for &ndead in counts {
            fs::write(paths.resume(), format!("{{\"ndead\":{ndead}}}")).unwrap();
            registry
                .record(
                    ndead,
                    RunStats {
                        ndead: ndead + 5,
                        ..RunStats::default()
                    },
                )
                .unwrap();
        }
        registry
    }

    #[test]
    fn latest_before_picks_last_checkpoint_ending_before_peak() {
        let dir = tempdir().unwrap();
        let registry = registry_with(dir.path(), &[5, 10, 15]);
        assert_eq!(registry.latest_before(12).map(|e| e.ndead), Some(10));
        assert_eq!(registry.latest_before(10).map(|e| e.ndead), Some(10));
        assert_eq!(registry.latest_before(9).map(|e| e.ndead), Some(5));
        assert!(registry.latest_before(4).is_none());
        assert!(registry.latest_before(0).is_none());
    }

    #[test]
    fn copies_hold_the_snapshot_contents() {
        let dir = tempdir().unwrap();
        let registry = registry_with(dir.path(), &[5, 10]);
        let entry = registry.latest_before(7).unwrap();
        assert_eq!(fs::read_to_string(&entry.path).unwrap(), "{\"ndead\":5}");
        assert_eq!(entry.stats.ndead, 10);
    }

    #[test]
    fn remove_files_deletes_each_copy_once() {
        let dir = tempdir().unwrap();
        let registry = registry_with(dir.path(), &[5, 10, 10]);
        assert_eq!(registry.len(), 2);
        let paths: Vec<PathBuf> = registry.entries().map(|e| e.path.clone()).collect();
        fs::remove_file(&paths[0]).unwrap();
        assert_eq!(registry.remove_files().unwrap(), 1);
        assert!(paths.iter().all(|p| !p.exists()));
    }

    #[test]
    fn remove_if_present_ignores_missing_files() {
        let dir = tempdir().unwrap();
        assert!(!remove_if_present(&dir.path().join("absent.resume")).unwrap());
    }
}
