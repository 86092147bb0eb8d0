//! Atomic, bincode-serialised checkpoint store (C8, §4.8, §6).
//!
//! Written by a temp-file-then-rename, the same atomic-swap pattern used
//! for resume files elsewhere in this codebase - except here the file is
//! replaced wholesale rather than appended to, since the driver checkpoints
//! the whole aggregator rather than a growing task log.

use std::io::Write;
use std::path::Path;

use ctm_core::aggregate::Aggregator;
use serde::{Deserialize, Serialize};

use crate::error::CliError;

pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointFile {
    pub version: u32,
    pub n_states: u32,
    pub max_runtime_steps: u64,
    pub use_reduced_enumeration: bool,
    pub blank_symbol: u8,
    pub batch_size: u128,
    /// Contiguous prefix of enumeration-index batches confirmed complete.
    pub watermark: u128,
    pub completion_applied: bool,
    pub aggregator: Aggregator,
}

impl CheckpointFile {
    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        let bytes = bincode::serialize(self).map_err(|source| CliError::CheckpointDecode {
            path: path.display().to_string(),
            source,
        })?;
        let tmp_path = path.with_extension("tmp");
        let mut file = std::fs::File::create(&tmp_path).map_err(|source| CliError::CheckpointIo {
            path: tmp_path.display().to_string(),
            source,
        })?;
        file.write_all(&bytes)
            .map_err(|source| CliError::CheckpointIo {
                path: tmp_path.display().to_string(),
                source,
            })?;
        file.sync_all().map_err(|source| CliError::CheckpointIo {
            path: tmp_path.display().to_string(),
            source,
        })?;
        std::fs::rename(&tmp_path, path).map_err(|source| CliError::CheckpointIo {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, CliError> {
        let bytes = std::fs::read(path).map_err(|source| CliError::CheckpointIo {
            path: path.display().to_string(),
            source,
        })?;
        let file: Self =
            bincode::deserialize(&bytes).map_err(|source| CliError::CheckpointDecode {
                path: path.display().to_string(),
                source,
            })?;
        if file.version != CHECKPOINT_FORMAT_VERSION {
            return Err(CliError::CheckpointVersion {
                found: file.version,
                expected: CHECKPOINT_FORMAT_VERSION,
            });
        }
        Ok(file)
    }

    /// Verify a loaded checkpoint matches the run it is being resumed into.
    pub fn verify_compatible(
        &self,
        path: &Path,
        n_states: u32,
        use_reduced_enumeration: bool,
    ) -> Result<(), CliError> {
        if self.n_states != n_states || self.use_reduced_enumeration != use_reduced_enumeration {
            return Err(CliError::CheckpointMismatch {
                path: path.display().to_string(),
                requested_n: n_states,
                requested_mode: mode_name(use_reduced_enumeration).to_string(),
                saved_n: self.n_states,
                saved_mode: mode_name(self.use_reduced_enumeration).to_string(),
            });
        }
        Ok(())
    }
}

fn mode_name(use_reduced_enumeration: bool) -> &'static str {
    if use_reduced_enumeration {
        "reduced"
    } else {
        "raw"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n_states: u32) -> CheckpointFile {
        CheckpointFile {
            version: CHECKPOINT_FORMAT_VERSION,
            n_states,
            max_runtime_steps: 200,
            use_reduced_enumeration: false,
            blank_symbol: 0,
            batch_size: 1000,
            watermark: 42,
            completion_applied: false,
            aggregator: Aggregator::new(),
        }
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctm.checkpoint");
        let checkpoint = sample(3);
        checkpoint.save(&path).unwrap();
        let loaded = CheckpointFile::load(&path).unwrap();
        assert_eq!(loaded.n_states, 3);
        assert_eq!(loaded.watermark, 42);
    }

    #[test]
    fn mismatched_n_states_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctm.checkpoint");
        sample(3).save(&path).unwrap();
        let loaded = CheckpointFile::load(&path).unwrap();
        assert!(loaded.verify_compatible(&path, 4, false).is_err());
    }

    #[test]
    fn mismatched_mode_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctm.checkpoint");
        sample(3).save(&path).unwrap();
        let loaded = CheckpointFile::load(&path).unwrap();
        assert!(loaded.verify_compatible(&path, 3, true).is_err());
    }

    #[test]
    fn future_format_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctm.checkpoint");
        let mut checkpoint = sample(3);
        checkpoint.version = CHECKPOINT_FORMAT_VERSION + 1;
        let bytes = bincode::serialize(&checkpoint).unwrap();
        std::fs::write(&path, bytes).unwrap();
        let err = CheckpointFile::load(&path).unwrap_err();
        assert!(matches!(err, CliError::CheckpointVersion { .. }));
    }
}
