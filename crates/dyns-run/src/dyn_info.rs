use std::fs;
use std::path::Path;

use dyns_alloc::Allocation;
use dyns_core::errors::ErrorInfo;
use dyns_core::{DynError, SamplerSettings};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Metadata describing how the dynamic run was allocated and launched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynInfo {
    /// Goal the allocation was computed for.
    pub goal: f64,
    /// Live points used by the exploratory run.
    pub ninit: usize,
    /// Total samples the procedure aimed for.
    pub target_samples: f64,
    /// Live-point allocation handed to the dynamic run.
    pub allocation: Allocation,
    /// Dead points of the exploratory run the dynamic run resumed after.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_ndead: Option<usize>,
    /// Likelihood evaluations already spent at the resume point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_nlike: Option<u64>,
    /// SHA-256 of the base sampler settings.
    pub settings_hash: String,
}

impl DynInfo {
    /// Returns true when the dynamic run resumed from an exploratory
    /// checkpoint.
    pub fn resumed(&self) -> bool {
        self.resume_ndead.is_some()
    }

    /// Writes the metadata to a JSON file, replacing any previous copy.
    pub fn write(&self, path: &Path) -> Result<(), DynError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| DynError::io("dyn-info-mkdir", err, parent))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| DynError::serde("dyn-info-serialize", err, path))?;
        fs::write(path, json).map_err(|err| DynError::io("dyn-info-write", err, path))
    }

    /// Loads metadata written by [`DynInfo::write`].
    pub fn load(path: &Path) -> Result<Self, DynError> {
        let contents =
            fs::read_to_string(path).map_err(|err| DynError::io("dyn-info-read", err, path))?;
        serde_json::from_str(&contents).map_err(|err| DynError::serde("dyn-info-parse", err, path))
    }
}

/// Stable hexadecimal digest of a settings record.
pub fn settings_hash(settings: &SamplerSettings) -> Result<String, DynError> {
    let bytes = serde_json::to_vec(settings).map_err(|err| {
        DynError::Serde(ErrorInfo::new("settings-serialize", err.to_string()))
    })?;
    Ok(format!("{:x}", Sha256::digest(bytes)))
}

#[cfg(test)]
mod tests {
    use dyns_core::NliveSchedule;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn info_survives_a_disk_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("gauss_dyn_info");
        let info = DynInfo {
            goal: 0.25,
            ninit: 5,
            target_samples: 400.0,
            allocation: Allocation {
                nlives: NliveSchedule::default(),
                peak_start_ind: 3,
                importance: vec![0.5, 1.0],
                importance_unsmoothed: vec![0.4, 1.0],
                nlive_curve: vec![5.0, 9.5],
                ninit: 5,
                dynamic_samples: 300.0,
            },
            resume_ndead: Some(2),
            resume_nlike: Some(31),
            settings_hash: settings_hash(&SamplerSettings::default()).unwrap(),
        };
        info.write(&path).unwrap();
        let loaded = DynInfo::load(&path).unwrap();
        assert_eq!(loaded, info);
        assert!(loaded.resumed());
    }

    #[test]
    fn settings_hash_tracks_changes() {
        let base = SamplerSettings::default();
        let a = settings_hash(&base).unwrap();
        assert_eq!(a, settings_hash(&base.clone()).unwrap());
        assert_ne!(a, settings_hash(&base.with_seed(3)).unwrap());
        assert_eq!(a.len(), 64);
    }
}
