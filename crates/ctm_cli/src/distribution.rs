//! JSON (de)serialisation of the final distribution (C11, §4.11, §6).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CliError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistributionFile {
    pub n: u32,
    pub m: u32,
    pub max_runtime_steps: u64,
    pub blank_symbol: u8,
    pub enumeration: String,
    pub completion_applied: bool,
    pub halting_total: u64,
    pub non_halting: HashMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<HashMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_counts: Option<HashMap<String, u64>>,
}

impl DistributionFile {
    pub fn write(&self, path: &Path) -> Result<(), CliError> {
        self.validate(path)?;
        let json = serde_json::to_string_pretty(self).map_err(|e| CliError::DistributionFormat {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| CliError::DistributionFormat {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn read(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|e| CliError::DistributionFormat {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let file: Self = serde_json::from_str(&text).map_err(|e| CliError::DistributionFormat {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        file.validate(path)?;
        Ok(file)
    }

    fn validate(&self, path: &Path) -> Result<(), CliError> {
        match (&self.distribution, &self.raw_counts) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            (None, None) => Err(CliError::DistributionFormat {
                path: path.display().to_string(),
                reason: "exactly one of `distribution` or `raw_counts` must be present, found neither".into(),
            }),
            (Some(_), Some(_)) => Err(CliError::DistributionFormat {
                path: path.display().to_string(),
                reason: "exactly one of `distribution` or `raw_counts` must be present, found both".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DistributionFile {
        let mut distribution = HashMap::new();
        distribution.insert("0".to_string(), 0.5);
        distribution.insert("1".to_string(), 0.25);
        let mut non_halting = HashMap::new();
        non_halting.insert("Timeout".to_string(), 7);
        DistributionFile {
            n: 2,
            m: 2,
            max_runtime_steps: 200,
            blank_symbol: 0,
            enumeration: "raw".into(),
            completion_applied: false,
            halting_total: 3,
            non_halting,
            distribution: Some(distribution),
            raw_counts: None,
        }
    }

    #[test]
    fn round_trips_through_json_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distribution.json");
        let file = sample();
        file.write(&path).unwrap();
        let loaded = DistributionFile::read(&path).unwrap();
        assert_eq!(loaded, file);
    }

    #[test]
    fn neither_distribution_nor_raw_counts_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distribution.json");
        let mut file = sample();
        file.distribution = None;
        assert!(file.write(&path).is_err());
    }

    #[test]
    fn both_distribution_and_raw_counts_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distribution.json");
        let mut file = sample();
        file.raw_counts = Some(HashMap::from([("0".to_string(), 5)]));
        assert!(file.write(&path).is_err());
    }
}
